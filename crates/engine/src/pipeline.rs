// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UploadPipeline: scan, categorize, stream-with-progressive-hash, and
//! finalize one upload session.

use crate::medium::{MediumError, SourceFile, SourceMedium};
use crate::scheduler::can_upload_old;
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use uo_adapters::{BackendAdapter, BusArbiter, BusError};
use uo_core::{folder_age_days, path_hash, FileFingerprint, JournalEvent, SessionStats};
use uo_storage::StateStore;

/// Folders skip the current session once their retry counter reaches this
/// many failures; they are retried next
/// session with the counter intact.
pub const MAX_RETRIES: u32 = 3;

/// How long a folder may sit empty (scanned, no payload files found) before
/// it is treated as complete rather than rescanned every session.
const PENDING_EMPTY_DAYS: u64 = 7;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("medium error: {0}")]
    Medium(#[from] MediumError),
    #[error("storage error: {0}")]
    Storage(#[from] uo_storage::StorageError),
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResult {
    Complete,
    Timeout,
    Error,
}

/// Which folders this session is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFilter {
    FreshOnly,
    OldOnly,
    All,
}

pub struct UploadPipeline {
    medium: Arc<dyn SourceMedium>,
    bus: Arc<BusArbiter>,
    backends: Vec<Box<dyn BackendAdapter>>,
    /// Host-active milliseconds observed by the ActivitySensor since the
    /// last session consumed them; fed by the Supervisor's tick loop, which
    /// runs concurrently with `run` while a session is open.
    host_active_ms: AtomicU64,
}

impl UploadPipeline {
    pub fn new(medium: Arc<dyn SourceMedium>, bus: Arc<BusArbiter>, backends: Vec<Box<dyn BackendAdapter>>) -> Self {
        Self { medium, bus, backends, host_active_ms: AtomicU64::new(0) }
    }

    /// Accumulate host-active time observed while an upload session may be
    /// open. Consumed (and zeroed) at the end of the next `run`.
    pub fn record_host_active(&self, ms: u64) {
        self.host_active_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Run one session to completion, deadline, or hard error.
    /// `recent_folder_days` bounds which already-completed folders Phase 2
    /// re-enters scanning for. `max_days` excludes folders older than that
    /// from both phases entirely, regardless of completion state.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        store: &mut StateStore,
        filter: SessionFilter,
        deadline: DateTime<Local>,
        now_local: impl Fn() -> DateTime<Local> + Send + Sync,
        start_hour: u8,
        end_hour: u8,
        recent_folder_days: u32,
        max_days: u32,
    ) -> Result<SessionResult, PipelineError> {
        let mut stats = SessionStats::new(chrono::Utc::now());

        for backend in &self.backends {
            let _ = backend.connect().await;
        }

        let mut result = SessionResult::Complete;

        'phases: for phase in [Phase::Fresh, Phase::Old] {
            if matches!(phase, Phase::Fresh) && filter == SessionFilter::OldOnly {
                continue;
            }
            if matches!(phase, Phase::Old) && filter == SessionFilter::FreshOnly {
                continue;
            }
            if matches!(phase, Phase::Old) && !can_upload_old(now_local(), start_hour, end_hour) {
                continue;
            }

            let mut folders = self.medium.list_data_folders().await?;
            folders.sort_unstable();
            folders.reverse();

            let today = now_local().date_naive();

            for folder in folders {
                if folder_age_days(&folder, today).unwrap_or(0) > max_days as i64 {
                    continue;
                }
                let completed = store.tables().is_completed(&folder);
                match phase {
                    // Fresh: folders not yet completed — new or still-in-progress data.
                    Phase::Fresh if completed => continue,
                    // Old: already-completed folders within the recent window, which
                    // may have been appended to since completion.
                    Phase::Old if !completed => continue,
                    Phase::Old => {
                        let age = folder_age_days(&folder, today).unwrap_or(i64::MAX);
                        if age > recent_folder_days as i64 {
                            continue;
                        }
                    }
                    _ => {}
                }
                if now_local() >= deadline {
                    result = SessionResult::Timeout;
                    break 'phases;
                }
                if store.tables().retry_count(&folder) >= MAX_RETRIES {
                    continue;
                }

                store.mark_in_use(&folder);
                let outcome = self.run_folder(store, &folder, &mut stats, &now_local, deadline).await;
                store.clear_in_use(&folder);
                store.flush()?;

                match outcome {
                    Ok(FolderOutcome::Completed) => {
                        store.queue(JournalEvent::FolderCompleted { name: folder.clone() })?;
                    }
                    Ok(FolderOutcome::PendingEmpty) => {
                        // PendingSeen (if this is the first empty scan) was
                        // already queued inside run_folder.
                    }
                    Ok(FolderOutcome::PartialFailure) => {
                        warn!(folder = %folder, "one or more files failed on every backend, retrying next session");
                        store.queue(JournalEvent::RetryIncr { name: folder.clone() })?;
                    }
                    Ok(FolderOutcome::DeadlineHit) => {
                        result = SessionResult::Timeout;
                        break 'phases;
                    }
                    Err(e) => {
                        warn!(folder = %folder, error = %e, "folder upload failed, incrementing retry counter");
                        store.queue(JournalEvent::RetryIncr { name: folder.clone() })?;
                        store.flush()?;
                    }
                }
            }
        }

        if stats.files_succeeded > 0 {
            self.finalize_imports(store, &mut stats).await;
        }

        stats.record_host_active(self.host_active_ms.swap(0, Ordering::Relaxed));
        store.queue(JournalEvent::SessionSummary { stats })?;
        store.flush()?;

        Ok(result)
    }

    async fn run_folder(
        &self,
        store: &mut StateStore,
        folder: &str,
        stats: &mut SessionStats,
        now_local: &(impl Fn() -> DateTime<Local> + Send + Sync),
        deadline: DateTime<Local>,
    ) -> Result<FolderOutcome, PipelineError> {
        let mut files = self.medium.list_files(folder).await?;
        files.sort_unstable_by(|a, b| a.name.cmp(&b.name));

        if files.is_empty() {
            return self.handle_empty_folder(store, folder, now_local);
        }

        let mut any_failed = false;

        for file in files {
            // Re-sampled on every file, not just on folder entry, so a slow
            // upload (real transfer time, real bus-hold settle) can still
            // trip the deadline before the next file starts.
            if now_local() >= deadline {
                return Ok(FolderOutcome::DeadlineHit);
            }
            let path = format!("{folder}/{}", file.name);
            let key = path_hash(&path);

            // Folder files are append-only data: change detection is
            // size-only. Mandatory config
            // files use content-hash detection but live outside the
            // per-folder scan; see `finalize_imports`.
            let current = FileFingerprint::append_only(&path, file.size);
            if let Some(known) = store.tables().fingerprint(key) {
                if !known.differs_from(&current) {
                    continue;
                }
            }

            if !self.upload_one(store, folder, &file, &path, key, stats).await? {
                any_failed = true;
            }
        }

        Ok(if any_failed { FolderOutcome::PartialFailure } else { FolderOutcome::Completed })
    }

    /// A folder with no payload files yet: record when it was first seen
    /// empty, and only call it complete once it has stayed empty for
    /// `PENDING_EMPTY_DAYS`. Until then it is rescanned every session.
    fn handle_empty_folder(
        &self,
        store: &mut StateStore,
        folder: &str,
        now_local: &(impl Fn() -> DateTime<Local> + Send + Sync),
    ) -> Result<FolderOutcome, PipelineError> {
        let now_ms = now_local().timestamp_millis().max(0) as u64;
        match store.tables().pending_folders.get(&folder.to_string()) {
            Some(&seen_at_ms) => {
                let empty_days = now_ms.saturating_sub(seen_at_ms) / (24 * 60 * 60 * 1000);
                if empty_days >= PENDING_EMPTY_DAYS {
                    Ok(FolderOutcome::Completed)
                } else {
                    Ok(FolderOutcome::PendingEmpty)
                }
            }
            None => {
                store.queue(JournalEvent::PendingSeen { name: folder.to_string(), seen_at_ms: now_ms })?;
                Ok(FolderOutcome::PendingEmpty)
            }
        }
    }

    async fn upload_one(
        &self,
        store: &mut StateStore,
        folder: &str,
        file: &SourceFile,
        remote_path: &str,
        key: u64,
        stats: &mut SessionStats,
    ) -> Result<bool, PipelineError> {
        let guard = self.bus.acquire()?;
        let (mut reader, size) = self.medium.open_file(folder, &file.name).await?;

        let mut buf = Vec::with_capacity(size as usize);
        let mut hasher = Sha256::new();
        let mut remaining = size;
        let mut chunk = [0u8; 4096];
        while remaining > 0 {
            let to_read = remaining.min(chunk.len() as u64) as usize;
            let n = reader.read(&mut chunk[..to_read]).await.map_err(MediumError::Io)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            buf.extend_from_slice(&chunk[..n]);
            remaining -= n as u64;
        }
        let checksum_hex = hex::encode(hasher.finalize());
        let hold_ms = guard.release() as u64;
        stats.record_hold(hold_ms);

        let mut succeeded = false;
        for backend in &self.backends {
            let mut slice: &[u8] = &buf;
            let outcome = backend
                .upload(remote_path, &mut slice, size, Some(&checksum_hex), backend.hash_policy())
                .await;
            match outcome {
                Ok(uo_adapters::UploadOutcome::Created | uo_adapters::UploadOutcome::AlreadyPresent) => {
                    succeeded = true;
                }
                Ok(uo_adapters::UploadOutcome::Failed) => {
                    warn!(backend = backend.name(), path = remote_path, "backend upload failed");
                }
                Err(e) => {
                    warn!(backend = backend.name(), path = remote_path, error = %e, "backend transport error");
                }
            }
        }

        stats.record_file_attempt(succeeded, size);

        if succeeded {
            store.queue(JournalEvent::FileUploaded { path_hash: key, size, checksum: None })?;
            info!(path = remote_path, size, "file uploaded");
        }

        Ok(succeeded)
    }

    async fn finalize_imports(&self, store: &mut StateStore, stats: &mut SessionStats) {
        let mandatory = match self.medium.mandatory_files().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "failed to list mandatory files, skipping finalize");
                return;
            }
        };

        for backend in &self.backends {
            if !backend.has_import_concept() {
                continue;
            }
            if let Err(e) = backend.begin_import().await {
                warn!(backend = backend.name(), error = %e, "begin_import failed");
                continue;
            }

            let mut all_mandatory_ok = true;
            for file in &mandatory {
                match self.upload_mandatory(store, backend.as_ref(), file, stats).await {
                    Ok(true) => {}
                    Ok(false) => {
                        all_mandatory_ok = false;
                        warn!(backend = backend.name(), file = %file.name, "mandatory file upload failed");
                    }
                    Err(e) => {
                        all_mandatory_ok = false;
                        warn!(backend = backend.name(), file = %file.name, error = %e, "mandatory file upload failed");
                    }
                }
            }

            if !all_mandatory_ok {
                warn!(backend = backend.name(), "skipping finalize_import: not every mandatory file uploaded");
                continue;
            }

            if let Err(e) = backend.finalize_import().await {
                warn!(backend = backend.name(), error = %e, "finalize_import failed");
            }
        }
    }

    /// Returns whether the file was uploaded successfully (`Ok(false)` on a
    /// plain backend rejection, not a hard transport error).
    async fn upload_mandatory(
        &self,
        store: &mut StateStore,
        backend: &dyn BackendAdapter,
        file: &SourceFile,
        stats: &mut SessionStats,
    ) -> Result<bool, PipelineError> {
        let hold_start_guard = self.bus.acquire()?;
        let (mut reader, size) = self.medium.open_mandatory_file(&file.name).await?;
        let mut buf = Vec::with_capacity(size as usize);
        let mut hasher = Sha256::new();
        reader.read_to_end(&mut buf).await.map_err(MediumError::Io)?;
        hasher.update(&buf);
        let checksum_hex = hex::encode(hasher.finalize());
        let hold_ms = hold_start_guard.release() as u64;
        stats.record_hold(hold_ms);

        let mut slice: &[u8] = &buf;
        let outcome = backend.upload(&file.name, &mut slice, size, Some(&checksum_hex), backend.hash_policy()).await;
        let succeeded = matches!(
            outcome,
            Ok(uo_adapters::UploadOutcome::Created | uo_adapters::UploadOutcome::AlreadyPresent)
        );
        stats.record_file_attempt(succeeded, size);
        if succeeded {
            let key = path_hash(&format!("mandatory/{}", file.name));
            store.queue(JournalEvent::FileUploaded { path_hash: key, size, checksum: Some(checksum_hex) })?;
        }
        Ok(succeeded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Old,
}

enum FolderOutcome {
    Completed,
    /// At least one file failed on every active backend (no hard transport
    /// error) — the folder is retried, not marked complete.
    PartialFailure,
    /// No payload files found; waiting out the empty-folder policy period
    /// before being marked complete.
    PendingEmpty,
    DeadlineHit,
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
