// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Resolve the private state directory: `UO_STATE_DIR` > `XDG_STATE_HOME/uo`
/// > `~/.local/state/uo`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("UO_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("uo");
    }
    dirs::state_dir().unwrap_or_else(|| PathBuf::from(".")).join("uo")
}

/// Root of the shared medium this device reads from (the SD card mount
/// point in production; an arbitrary directory in development).
pub fn medium_root() -> PathBuf {
    std::env::var("UO_MEDIUM_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/mnt/medium"))
}

/// Path to the `key = value` configuration text file.
pub fn config_path() -> PathBuf {
    std::env::var("UO_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| state_dir().join("config.txt"))
}

/// `host:port` the HTTP status surface binds to.
pub fn http_addr() -> String {
    std::env::var("UO_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8787".to_string())
}

/// Fatal watchdog timeout in seconds, overridable for tests (default 120s).
pub fn watchdog_fatal_secs() -> u64 {
    std::env::var("UO_WATCHDOG_FATAL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(120)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
