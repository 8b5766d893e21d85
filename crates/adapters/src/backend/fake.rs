// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backend adapter for pipeline tests.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BackendAdapter, BackendError, HashPolicy, UploadOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Connect,
    Disconnect,
    BeginImport,
    FinalizeImport,
    Upload { remote_path: String, size: u64, checksum_hex: Option<String> },
}

struct FakeState {
    calls: Vec<BackendCall>,
    uploaded: Vec<(String, Vec<u8>)>,
    fail_uploads: bool,
    fail_paths: HashSet<String>,
    import_active: bool,
}

/// Records every call made to it; used to assert pipeline behavior without
/// a real network backend.
#[derive(Clone)]
pub struct FakeBackendAdapter {
    name: String,
    has_import_concept: bool,
    inner: Arc<Mutex<FakeState>>,
}

impl FakeBackendAdapter {
    pub fn new(name: impl Into<String>, has_import_concept: bool) -> Self {
        Self {
            name: name.into(),
            has_import_concept,
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                uploaded: Vec::new(),
                fail_uploads: false,
                fail_paths: HashSet::new(),
                import_active: false,
            })),
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().calls.clone()
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        self.inner.lock().uploaded.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Byte length most recently uploaded at `path`, for tests asserting an
    /// exact size-locked transfer.
    pub fn uploaded_len(&self, path: &str) -> Option<usize> {
        self.inner.lock().uploaded.iter().rev().find(|(p, _)| p == path).map(|(_, bytes)| bytes.len())
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.inner.lock().fail_uploads = fail;
    }

    /// Fail uploads to this one remote path, leaving every other path
    /// succeeding.
    pub fn set_fail_path(&self, path: impl Into<String>) {
        self.inner.lock().fail_paths.insert(path.into());
    }
}

#[async_trait]
impl BackendAdapter for FakeBackendAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::Connect);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::Disconnect);
        Ok(())
    }

    fn has_import_concept(&self) -> bool {
        self.has_import_concept
    }

    async fn begin_import(&self) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::BeginImport);
        inner.import_active = true;
        Ok(())
    }

    async fn finalize_import(&self) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::FinalizeImport);
        Ok(())
    }

    async fn upload(
        &self,
        remote_path: &str,
        source: &mut (dyn AsyncRead + Send + Unpin),
        size: u64,
        checksum_hex: Option<&str>,
        _hash_policy: HashPolicy,
    ) -> Result<UploadOutcome, BackendError> {
        let mut buf = Vec::with_capacity(size as usize);
        source.take(size).read_to_end(&mut buf).await?;

        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Upload {
            remote_path: remote_path.to_string(),
            size,
            checksum_hex: checksum_hex.map(str::to_string),
        });
        if inner.fail_uploads || inner.fail_paths.contains(remote_path) {
            return Ok(UploadOutcome::Failed);
        }
        inner.uploaded.push((remote_path.to_string(), buf));
        Ok(UploadOutcome::Created)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
