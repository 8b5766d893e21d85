// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! share-adapter: writes to a network file share mounted at a local path
//! (the share protocol's own client is assumed already mounted by the OS;
//! this adapter only knows how to stream bytes onto it).

use super::{BackendAdapter, BackendError, HashPolicy, UploadOutcome};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::info;

pub struct ShareAdapter {
    root: PathBuf,
}

impl ShareAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BackendAdapter for ShareAdapter {
    fn name(&self) -> &str {
        "share"
    }

    async fn connect(&self) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn upload(
        &self,
        remote_path: &str,
        source: &mut (dyn AsyncRead + Send + Unpin),
        size: u64,
        _checksum_hex: Option<&str>,
        _hash_policy: HashPolicy,
    ) -> Result<UploadOutcome, BackendError> {
        let dest = self.root.join(remote_path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Idempotent on re-upload: always overwrite, never append.
        let mut file = tokio::fs::File::create(&dest).await?;
        let mut remaining = size;
        let mut buf = [0u8; 4096];
        while remaining > 0 {
            let to_read = remaining.min(buf.len() as u64) as usize;
            let n = source.read(&mut buf[..to_read]).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            remaining -= n as u64;
        }
        file.flush().await?;

        info!(path = remote_path, size, "share upload complete");
        Ok(UploadOutcome::Created)
    }
}

#[cfg(test)]
#[path = "share_tests.rs"]
mod tests;
