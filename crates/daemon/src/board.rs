// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Board support shims: the concrete hardware façades `uo-engine`'s traits
//! are generic over (bus mux lines, filesystem mount verbs, edge counter).
//! Real register/GPIO access is board-specific and lives outside this
//! core — this module is the seam a board support package replaces piece
//! by piece. The
//! filesystem-backed [`DirectorySourceMedium`] is the one piece that is
//! genuinely implemented rather than stubbed, since "read files under a
//! mounted directory" does not require hardware access.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::io::AsyncRead;
use tracing::warn;
use uo_core::BusOwnership;
use uo_engine::medium::{MediumError, SourceFile, SourceMedium};
use uo_engine::readonly_fs::{MountOps, ReadOnlyFsError};

/// Bus mux lines. On this host there is no physical mux to drive; each
/// call logs at the point a board support package would pulse GPIOs.
pub struct NullBusLines;

impl uo_adapters::BusLines for NullBusLines {
    fn drive_mux(&self, ownership: BusOwnership) {
        tracing::debug!(?ownership, "drive_mux (no physical mux on this host)");
    }

    fn unmount_shared_medium(&self) {
        tracing::debug!("unmount_shared_medium (no-op on this host)");
    }

    fn send_soft_reset_frame(&self, _frame: [u8; 6]) {
        tracing::debug!("send_soft_reset_frame (no-op on this host)");
    }
}

/// Mount verbs for the shared medium, backed by a plain directory rather
/// than an actual block device mount on this host.
pub struct DirectoryMountOps {
    root: PathBuf,
}

impl DirectoryMountOps {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MountOps for DirectoryMountOps {
    fn mount_ro(&self) -> Result<(), ReadOnlyFsError> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn remount_rw(&self) -> Result<(), ReadOnlyFsError> {
        Ok(())
    }

    fn remount_ro(&self) -> Result<(), ReadOnlyFsError> {
        Ok(())
    }

    fn unmount(&self) -> Result<(), ReadOnlyFsError> {
        Ok(())
    }
}

/// `SourceMedium` backed by a plain directory tree: one subdirectory per
/// `YYYYMMDD` data folder, plus a fixed set of mandatory file names in the
/// root. Stands in for the board's real SD-card access.
pub struct DirectorySourceMedium {
    root: PathBuf,
    mandatory_names: Vec<String>,
}

impl DirectorySourceMedium {
    pub fn new(root: impl Into<PathBuf>, mandatory_names: Vec<String>) -> Self {
        Self { root: root.into(), mandatory_names }
    }
}

#[async_trait]
impl SourceMedium for DirectorySourceMedium {
    async fn list_data_folders(&self) -> Result<Vec<String>, MediumError> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if uo_core::is_folder_name(name) {
                        out.push(name.to_string());
                    }
                }
            }
        }
        Ok(out)
    }

    async fn list_files(&self, folder: &str) -> Result<Vec<SourceFile>, MediumError> {
        let dir = self.root.join(folder);
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    let size = entry.metadata().await?.len();
                    out.push(SourceFile { name: name.to_string(), size, mutable_config: false });
                }
            }
        }
        Ok(out)
    }

    async fn open_file(&self, folder: &str, name: &str) -> Result<(Box<dyn AsyncRead + Send + Unpin>, u64), MediumError> {
        let path = self.root.join(folder).join(name);
        let file = tokio::fs::File::open(&path).await?;
        let size = file.metadata().await?.len();
        Ok((Box::new(file), size))
    }

    async fn mandatory_files(&self) -> Result<Vec<SourceFile>, MediumError> {
        let mut out = Vec::new();
        for name in &self.mandatory_names {
            match tokio::fs::metadata(self.root.join(name)).await {
                Ok(meta) => out.push(SourceFile { name: name.clone(), size: meta.len(), mutable_config: true }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(file = %name, "mandatory file missing on shared medium");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }

    async fn open_mandatory_file(&self, name: &str) -> Result<(Box<dyn AsyncRead + Send + Unpin>, u64), MediumError> {
        let path = self.root.join(name);
        let file = tokio::fs::File::open(&path).await?;
        let size = file.metadata().await?.len();
        Ok((Box::new(file), size))
    }
}

/// Edge counter closure for [`uo_adapters::HardwareActivitySensor`]: no
/// physical GPIO on this host, so it always reports zero edges (permanent
/// idle). A board support package replaces this with a real register read.
pub fn null_edge_counter() -> impl Fn() -> u32 + Send + Sync {
    let counter = AtomicU32::new(0);
    move || counter.load(Ordering::Relaxed)
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod tests;
