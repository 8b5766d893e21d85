// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SourceMedium: read-only access to data folders and mandatory config
//! files on the shared medium. Implemented by
//! the board support layer; this crate only sequences scan/read calls.

use async_trait::async_trait;
use std::io;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum MediumError {
    #[error("medium I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One candidate file inside a data folder, or a mandatory root file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    /// `true` for mandatory config files that mutate in place
    /// (content-hash change detection); `false` for append-only data.
    pub mutable_config: bool,
}

/// Read-only view of the shared medium's folder/file layout. Every read
/// happens while a [`uo_adapters::BusGuard`] is held by the caller; this
/// trait does not manage bus ownership itself.
#[async_trait]
pub trait SourceMedium: Send + Sync {
    /// `YYYYMMDD` data folder names currently present, unsorted.
    async fn list_data_folders(&self) -> Result<Vec<String>, MediumError>;

    /// Candidate files within one data folder, unsorted.
    async fn list_files(&self, folder: &str) -> Result<Vec<SourceFile>, MediumError>;

    /// Open `folder/name` for a single-read stream, snapshotting its size
    /// at open time — the value the caller size-locks against.
    async fn open_file(
        &self,
        folder: &str,
        name: &str,
    ) -> Result<(Box<dyn AsyncRead + Send + Unpin>, u64), MediumError>;

    /// Mandatory root/config files uploaded once per touched import
    /// (Phase 3), independent of which data folders were touched.
    async fn mandatory_files(&self) -> Result<Vec<SourceFile>, MediumError>;

    async fn open_mandatory_file(
        &self,
        name: &str,
    ) -> Result<(Box<dyn AsyncRead + Send + Unpin>, u64), MediumError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSourceMedium;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// A fixed in-memory byte buffer that implements [`AsyncRead`], used by
    /// the fake medium to hand out a size-locked snapshot read.
    struct VecCursor {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl VecCursor {
        fn new(bytes: Vec<u8>) -> Self {
            Self { bytes, pos: 0 }
        }
    }

    impl AsyncRead for VecCursor {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let remaining = &self.bytes[self.pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    /// In-memory `SourceMedium` for tests: folders/files are plain byte
    /// buffers, mutable in place so tests can simulate append-during-read.
    #[derive(Default)]
    pub struct FakeSourceMedium {
        folders: Mutex<HashMap<String, HashMap<String, Arc<Mutex<Vec<u8>>>>>>,
        mandatory: Mutex<HashMap<String, Arc<Mutex<Vec<u8>>>>>,
    }

    impl FakeSourceMedium {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put_file(&self, folder: &str, name: &str, bytes: Vec<u8>) {
            self.folders
                .lock()
                .entry(folder.to_string())
                .or_default()
                .insert(name.to_string(), Arc::new(Mutex::new(bytes)));
        }

        pub fn put_mandatory(&self, name: &str, bytes: Vec<u8>) {
            self.mandatory.lock().insert(name.to_string(), Arc::new(Mutex::new(bytes)));
        }

        /// Register a data folder with no files in it, so `list_data_folders`
        /// reports it without ever giving it any payload to scan.
        pub fn put_empty_folder(&self, folder: &str) {
            self.folders.lock().entry(folder.to_string()).or_default();
        }

        /// Append bytes to an already-stored file, simulating the host
        /// appliance writing more data mid-session.
        pub fn append_to(&self, folder: &str, name: &str, extra: &[u8]) {
            let folders = self.folders.lock();
            let file = folders.get(folder).and_then(|f| f.get(name)).expect("file exists");
            file.lock().extend_from_slice(extra);
        }
    }

    #[async_trait]
    impl SourceMedium for FakeSourceMedium {
        async fn list_data_folders(&self) -> Result<Vec<String>, MediumError> {
            Ok(self.folders.lock().keys().cloned().collect())
        }

        async fn list_files(&self, folder: &str) -> Result<Vec<SourceFile>, MediumError> {
            let folders = self.folders.lock();
            let Some(files) = folders.get(folder) else {
                return Ok(Vec::new());
            };
            Ok(files
                .iter()
                .map(|(name, bytes)| SourceFile {
                    name: name.clone(),
                    size: bytes.lock().len() as u64,
                    mutable_config: false,
                })
                .collect())
        }

        async fn open_file(
            &self,
            folder: &str,
            name: &str,
        ) -> Result<(Box<dyn AsyncRead + Send + Unpin>, u64), MediumError> {
            let folders = self.folders.lock();
            let bytes = folders
                .get(folder)
                .and_then(|f| f.get(name))
                .ok_or_else(|| MediumError::Io(io::Error::new(io::ErrorKind::NotFound, name.to_string())))?;
            let snapshot = bytes.lock().clone();
            let size = snapshot.len() as u64;
            Ok((Box::new(VecCursor::new(snapshot)), size))
        }

        async fn mandatory_files(&self) -> Result<Vec<SourceFile>, MediumError> {
            Ok(self
                .mandatory
                .lock()
                .iter()
                .map(|(name, bytes)| SourceFile { name: name.clone(), size: bytes.lock().len() as u64, mutable_config: true })
                .collect())
        }

        async fn open_mandatory_file(
            &self,
            name: &str,
        ) -> Result<(Box<dyn AsyncRead + Send + Unpin>, u64), MediumError> {
            let mandatory = self.mandatory.lock();
            let bytes = mandatory
                .get(name)
                .ok_or_else(|| MediumError::Io(io::Error::new(io::ErrorKind::NotFound, name.to_string())))?;
            let snapshot = bytes.lock().clone();
            let size = snapshot.len() as u64;
            Ok((Box::new(VecCursor::new(snapshot)), size))
        }
    }
}
