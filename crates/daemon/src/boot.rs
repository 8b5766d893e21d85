// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for [`uo_core::BootReason`] — the one piece of state that
//! survives outside `StateStore`: a small flag written just before a
//! planned reboot so the next boot can explain why it happened.

use std::path::{Path, PathBuf};
use thiserror::Error;
use uo_core::BootReason;

#[derive(Debug, Error)]
pub enum BootReasonError {
    #[error("boot reason I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("boot reason parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read the last persisted boot reason, if any. Absence (e.g. first boot,
/// or the file was consumed by a previous read) is not an error.
pub fn read(state_dir: &Path) -> Result<Option<BootReason>, BootReasonError> {
    let path = boot_reason_path(state_dir);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persist `reason` for the next boot to observe.
pub fn write(state_dir: &Path, reason: &BootReason) -> Result<(), BootReasonError> {
    let path = boot_reason_path(state_dir);
    let text = serde_json::to_string(reason)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Consume the persisted boot reason so the next boot doesn't see it again.
pub fn clear(state_dir: &Path) -> Result<(), BootReasonError> {
    let path = boot_reason_path(state_dir);
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn boot_reason_path(state_dir: &Path) -> PathBuf {
    state_dir.join("boot_reason")
}

#[cfg(test)]
#[path = "boot_tests.rs"]
mod tests;
