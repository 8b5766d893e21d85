// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::time::Duration;

/// Base URL of the daemon's HTTP status surface.
pub fn daemon_url() -> String {
    std::env::var("UO_HTTP_ADDR")
        .map(|addr| if addr.starts_with("http") { addr } else { format!("http://{addr}") })
        .unwrap_or_else(|_| "http://127.0.0.1:8787".to_string())
}

/// Timeout for a single request to the daemon, overridable for slow links.
pub fn request_timeout() -> Duration {
    std::env::var("UO_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
