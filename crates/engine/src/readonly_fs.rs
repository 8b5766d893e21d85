// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ReadOnlyFs: mounts the shared medium read-only for normal operation,
//! with a narrowly scoped read-write escape hatch for the config-editor
//! surface.

use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};
use uo_adapters::BusGuard;

#[derive(Debug, Error)]
pub enum ReadOnlyFsError {
    #[error("mount failed: {0}")]
    MountFailed(String),
    #[error("remount failed: {0}")]
    RemountFailed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mount/unmount verbs for the shared medium. Implemented by the board
/// support layer; this crate only sequences calls and owns the RAII
/// lifetime invariant.
pub trait MountOps: Send + Sync {
    fn mount_ro(&self) -> Result<(), ReadOnlyFsError>;
    fn remount_rw(&self) -> Result<(), ReadOnlyFsError>;
    fn remount_ro(&self) -> Result<(), ReadOnlyFsError>;
    fn unmount(&self) -> Result<(), ReadOnlyFsError>;
}

pub struct ReadOnlyFs<M: MountOps> {
    ops: M,
}

impl<M: MountOps> ReadOnlyFs<M> {
    pub fn new(ops: M) -> Self {
        Self { ops }
    }

    /// Mount the shared medium read-only, returning an RAII handle. All
    /// core write paths for progress data must target the private
    /// device-local filesystem instead — nothing routed through this
    /// handle is ever opened for writing.
    pub fn mount_ro(&self) -> Result<Handle<'_, M>, ReadOnlyFsError> {
        self.ops.mount_ro().map_err(|e| ReadOnlyFsError::MountFailed(e.to_string()))?;
        info!("shared medium mounted read-only");
        Ok(Handle { fs: self })
    }

    /// Escape hatch for the config-editor surface: briefly remount
    /// read-write, write `payload` to `path`, then remount read-only
    /// before returning. Requires an active [`BusGuard`] — the caller is
    /// asserting it already owns the bus — and never yields the guard
    /// while the medium is writable.
    pub fn remount_rw_briefly(
        &self,
        _guard: &BusGuard<'_>,
        path: &Path,
        payload: &[u8],
    ) -> Result<(), ReadOnlyFsError> {
        self.ops.remount_rw().map_err(|e| ReadOnlyFsError::RemountFailed(e.to_string()))?;
        let result = std::fs::write(path, payload);
        if let Err(e) = self.ops.remount_ro() {
            warn!(error = %e, "failed to remount read-only after config write");
            return Err(ReadOnlyFsError::RemountFailed(e.to_string()));
        }
        result.map_err(ReadOnlyFsError::from)
    }
}

/// RAII scope for the read-only mount. All file handles opened against the
/// shared medium must be tied to this lifetime and close before it does;
/// any abstraction permitting the two to overlap is a bug.
pub struct Handle<'a, M: MountOps> {
    fs: &'a ReadOnlyFs<M>,
}

impl<M: MountOps> Drop for Handle<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.fs.ops.unmount() {
            warn!(error = %e, "unmount failed on handle drop");
        }
    }
}

#[cfg(test)]
#[path = "readonly_fs_tests.rs"]
mod tests;
