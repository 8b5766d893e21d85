// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cloud-adapter: multipart upload over a persistent HTTP connection, with
//! an import lifecycle and 200/201 dedup semantics.

use super::{BackendAdapter, BackendError, HashPolicy, UploadOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

#[derive(Debug, Clone)]
enum ImportState {
    NotStarted,
    Active { import_id: String },
    /// Import creation failed once this session; don't retry, and the
    /// pipeline treats this backend as skipped for the remainder of it.
    Skipped,
}

pub struct CloudAdapter {
    base_url: Url,
    client: Client,
    import: Mutex<ImportState>,
}

impl CloudAdapter {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: Client::new(),
            import: Mutex::new(ImportState::NotStarted),
        }
    }

    pub fn with_client(base_url: Url, client: Client) -> Self {
        Self {
            base_url,
            client,
            import: Mutex::new(ImportState::NotStarted),
        }
    }

    fn import_id(&self) -> Option<String> {
        match &*self.import.lock() {
            ImportState::Active { import_id } => Some(import_id.clone()),
            _ => None,
        }
    }

    /// Lazily create the remote import on first call. Subsequent calls
    /// reuse the cached id; a prior failure short-circuits to `Skipped`.
    async fn ensure_import(&self) -> Result<Option<String>, BackendError> {
        {
            match &*self.import.lock() {
                ImportState::Active { import_id } => return Ok(Some(import_id.clone())),
                ImportState::Skipped => return Ok(None),
                ImportState::NotStarted => {}
            }
        }

        let url = self
            .base_url
            .join("imports")
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let result = self.client.post(url).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<ImportCreated>().await {
                Ok(body) => {
                    *self.import.lock() = ImportState::Active { import_id: body.import_id.clone() };
                    Ok(Some(body.import_id))
                }
                Err(e) => {
                    warn!(error = %e, "import creation response unparseable, skipping cloud for session");
                    *self.import.lock() = ImportState::Skipped;
                    Ok(None)
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "import creation failed, skipping cloud for session");
                *self.import.lock() = ImportState::Skipped;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "import creation transport error, skipping cloud for session");
                *self.import.lock() = ImportState::Skipped;
                Ok(None)
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct ImportCreated {
    import_id: String,
}

#[async_trait]
impl BackendAdapter for CloudAdapter {
    fn name(&self) -> &str {
        "cloud"
    }

    async fn connect(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn has_import_concept(&self) -> bool {
        true
    }

    fn hash_policy(&self) -> HashPolicy {
        HashPolicy::TrailingField
    }

    async fn begin_import(&self) -> Result<(), BackendError> {
        // Actual creation is deferred to the first successful upload.
        Ok(())
    }

    async fn finalize_import(&self) -> Result<(), BackendError> {
        let Some(import_id) = self.import_id() else {
            return Ok(());
        };
        let url = self
            .base_url
            .join(&format!("imports/{import_id}/finalize"))
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let resp = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BackendError::Transport(format!("finalize failed: {}", resp.status())));
        }
        Ok(())
    }

    async fn upload(
        &self,
        remote_path: &str,
        source: &mut (dyn AsyncRead + Send + Unpin),
        size: u64,
        checksum_hex: Option<&str>,
        hash_policy: HashPolicy,
    ) -> Result<UploadOutcome, BackendError> {
        let Some(import_id) = self.ensure_import().await? else {
            return Ok(UploadOutcome::Failed);
        };

        let mut buf = Vec::with_capacity(size as usize);
        source.take(size).read_to_end(&mut buf).await?;

        // Hash field placed after the file part: progressive hash at send
        // time means the caller has already finished hashing by the time
        // this is called, so here it's simply appended last in the form.
        let mut form = Form::new()
            .part("path", Part::text(remote_path.to_string()))
            .part("file", Part::bytes(buf).file_name(remote_path.to_string()));
        if let (HashPolicy::TrailingField, Some(hash)) = (hash_policy, checksum_hex) {
            form = form.text("hash", hash.to_string());
        }

        let url = self
            .base_url
            .join(&format!("imports/{import_id}/files"))
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let resp = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let outcome = match resp.status() {
            StatusCode::OK => UploadOutcome::AlreadyPresent,
            StatusCode::CREATED => UploadOutcome::Created,
            status => {
                warn!(%status, path = remote_path, "cloud upload failed");
                UploadOutcome::Failed
            }
        };
        info!(path = remote_path, ?outcome, "cloud upload complete");
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "cloud_tests.rs"]
mod tests;
