// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! StateStore: the crash-safe, bounded-memory persistence layer owned
//! exclusively by the UploadPipeline during a session and by the FSM
//! between sessions.

use crate::error::StorageError;
use crate::journal::Journal;
use crate::tables::StateTables;
use crate::{snapshot, summary};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;
use uo_core::{JournalEvent, SessionStats};

/// Snapshot + truncate once this many events have accumulated since the
/// last compaction (~250 events).
pub const COMPACTION_THRESHOLD: u64 = 250;

pub struct StateStore {
    journal: Journal,
    snapshot_path: PathBuf,
    summary_path: PathBuf,
    tables: StateTables,
    in_use_folders: HashSet<String>,
}

impl StateStore {
    /// Open the store rooted at `dir` on the private device-local
    /// filesystem: loads the most recent snapshot, then replays the
    /// journal on top of it.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join("state.snapshot");
        let journal_path = dir.join("state.journal");
        let summary_path = dir.join("summary.current");

        let mut tables = snapshot::load(&snapshot_path)?;
        let journal = Journal::open(&journal_path)?;
        let replayed = Journal::replay(&journal_path)?;
        let none = HashSet::new();
        for event in &replayed {
            tables.apply(event, &none);
        }

        info!(
            completed_folders = tables.completed_folders.len(),
            file_fingerprints = tables.file_fingerprints.len(),
            journal_entries_replayed = replayed.len(),
            "state store loaded",
        );

        Ok(Self {
            journal,
            snapshot_path,
            summary_path,
            tables,
            in_use_folders: HashSet::new(),
        })
    }

    pub fn tables(&self) -> &StateTables {
        &self.tables
    }

    /// Mark a folder as currently open by the UploadPipeline, protecting
    /// its StateTable entries from eviction for the duration.
    pub fn mark_in_use(&mut self, folder: &str) {
        self.in_use_folders.insert(folder.to_string());
    }

    pub fn clear_in_use(&mut self, folder: &str) {
        self.in_use_folders.remove(folder);
    }

    /// Apply an event to the in-memory tables immediately (so the current
    /// session sees its own writes) and queue it for the next flush.
    pub fn queue(&mut self, event: JournalEvent) -> Result<(), StorageError> {
        if let JournalEvent::SessionSummary { stats } = &event {
            summary::write(&self.summary_path, stats)?;
        }
        self.tables.apply(&event, &self.in_use_folders);
        self.journal.append(event);
        Ok(())
    }

    /// Flush queued events to disk, then compact if the journal has grown
    /// past [`COMPACTION_THRESHOLD`] since the last snapshot.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.journal.flush()?;
        if self.journal.written_since_snapshot() >= COMPACTION_THRESHOLD {
            self.snapshot()?;
        }
        Ok(())
    }

    /// Force an immediate snapshot + journal truncation regardless of the
    /// compaction threshold (used before a planned restart).
    pub fn snapshot(&mut self) -> Result<(), StorageError> {
        snapshot::save(&self.tables, &self.snapshot_path)?;
        self.journal.truncate()?;
        Ok(())
    }

    /// Last-completed session summary, if one has ever been written.
    pub fn last_session_summary(&self) -> Result<Option<SessionStats>, StorageError> {
        summary::read(&self.summary_path)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
