// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! BackendAdapter: per-backend upload verbs, import lifecycle, and
//! content-hash-in-trailer semantics.

mod cloud;
mod share;

pub use cloud::CloudAdapter;
pub use share::ShareAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BackendCall, FakeBackendAdapter};

use async_trait::async_trait;
use std::io;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("import not open for this session")]
    NoActiveImport,
}

/// How the uploaded content's hash should be conveyed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashPolicy {
    /// Backend accepts a trailing hash field; send it after the payload in
    /// the same request, computed progressively as bytes are streamed.
    TrailingField,
    /// Backend has no trailer mechanism; the hash must be fully computed
    /// before the first byte is sent.
    PrecomputeBeforeSend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Created,
    AlreadyPresent,
    Failed,
}

/// Per-backend upload surface. Object-safe so the pipeline can hold a
/// `Vec<Box<dyn BackendAdapter>>` without knowing concrete backend types.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Human-readable name used in logs and SessionStats breakdowns.
    fn name(&self) -> &str;

    /// Idempotent; may reuse an existing connection/session.
    async fn connect(&self) -> Result<(), BackendError>;

    async fn disconnect(&self) -> Result<(), BackendError>;

    /// `hash_policy` tells the caller when to compute the hash; `source`
    /// yields exactly `size` bytes (the size-locked read).
    async fn upload(
        &self,
        remote_path: &str,
        source: &mut (dyn AsyncRead + Send + Unpin),
        size: u64,
        checksum_hex: Option<&str>,
        hash_policy: HashPolicy,
    ) -> Result<UploadOutcome, BackendError>;

    /// No-op for backends without an import concept (share-adapter).
    /// Lazily called on first successful file for backends that do
    /// (cloud-adapter).
    async fn begin_import(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn finalize_import(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Whether this backend models an import (mandatory files must be
    /// uploaded per import before finalize).
    fn has_import_concept(&self) -> bool {
        false
    }

    /// Which hash-conveyance scheme this backend accepts.
    /// Backends without a trailer mechanism get the hash precomputed.
    fn hash_policy(&self) -> HashPolicy {
        HashPolicy::PrecomputeBeforeSend
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
