// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The four bounded StateTable collections and the fold rule that replays
//! [`JournalEvent`]s into them.

use crate::bounded::BoundedMap;
use std::collections::HashSet;
use uo_core::{FileFingerprint, JournalEvent};

/// Cap for `completed_folders`.
pub const COMPLETED_FOLDERS_CAP: usize = 368;
/// Cap for `file_fingerprints`.
pub const FILE_FINGERPRINTS_CAP: usize = 250;
/// Cap for `pending_folders`, bounded to the same order of magnitude as
/// `completed_folders` since every pending folder eventually becomes a
/// completed one.
pub const PENDING_FOLDERS_CAP: usize = 368;
/// Cap for `retry_counters`. Bounded generously since it only ever holds
/// folders currently failing, a small fraction of `completed_folders`.
pub const RETRY_COUNTERS_CAP: usize = 64;

/// Materialized StateTable: the bounded in-memory tables, rebuildable by
/// folding a snapshot followed by journal entries.
#[derive(Debug, Clone)]
pub struct StateTables {
    pub completed_folders: BoundedMap<String, ()>,
    pub file_fingerprints: BoundedMap<u64, FileFingerprint>,
    pub pending_folders: BoundedMap<String, u64>,
    pub retry_counters: BoundedMap<String, u32>,
}

impl Default for StateTables {
    fn default() -> Self {
        Self {
            completed_folders: BoundedMap::new(COMPLETED_FOLDERS_CAP),
            file_fingerprints: BoundedMap::new(FILE_FINGERPRINTS_CAP),
            pending_folders: BoundedMap::new(PENDING_FOLDERS_CAP),
            retry_counters: BoundedMap::new(RETRY_COUNTERS_CAP),
        }
    }
}

impl StateTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, folder: &str) -> bool {
        self.completed_folders.contains(&folder.to_string())
    }

    pub fn fingerprint(&self, path_hash: u64) -> Option<&FileFingerprint> {
        self.file_fingerprints.get(&path_hash)
    }

    pub fn retry_count(&self, folder: &str) -> u32 {
        self.retry_counters.get(&folder.to_string()).copied().unwrap_or(0)
    }

    /// Fold one journal event into the tables. `in_use_folders` protects
    /// folders the UploadPipeline currently has open from eviction while
    /// this event is applied; `SessionSummary` carries no table mutation
    /// (it is persisted separately as `summary.current`, see uo-storage::store).
    pub fn apply(&mut self, event: &JournalEvent, in_use_folders: &HashSet<String>) {
        match event {
            JournalEvent::FolderCompleted { name } => {
                self.pending_folders.remove(name);
                self.retry_counters.remove(name);
                self.completed_folders.insert(name.clone(), (), in_use_folders);
            }
            JournalEvent::FileUploaded { path_hash, size, checksum } => {
                let protected = HashSet::new();
                let fp = FileFingerprint {
                    path_hash: *path_hash,
                    size: *size,
                    checksum: checksum.clone(),
                };
                self.file_fingerprints.insert(*path_hash, fp, &protected);
            }
            JournalEvent::PendingSeen { name, seen_at_ms } => {
                if !self.pending_folders.contains(name) {
                    self.pending_folders.insert(name.clone(), *seen_at_ms, in_use_folders);
                }
            }
            JournalEvent::RetryIncr { name } => {
                let next = self.retry_count(name) + 1;
                self.retry_counters.insert(name.clone(), next, in_use_folders);
            }
            JournalEvent::SessionSummary { .. } => {}
        }
    }

    /// Re-express current table contents as a sequence of journal events,
    /// in insertion order, suitable for writing as a compacted snapshot.
    /// `SessionSummary` events are never re-emitted (they aren't table state).
    pub fn to_events(&self) -> Vec<JournalEvent> {
        let mut events = Vec::new();
        for (name, _) in self.completed_folders.iter() {
            events.push(JournalEvent::FolderCompleted { name: name.clone() });
        }
        for (path_hash, fp) in self.file_fingerprints.iter() {
            events.push(JournalEvent::FileUploaded {
                path_hash: *path_hash,
                size: fp.size,
                checksum: fp.checksum.clone(),
            });
        }
        for (name, seen_at_ms) in self.pending_folders.iter() {
            events.push(JournalEvent::PendingSeen { name: name.clone(), seen_at_ms: *seen_at_ms });
        }
        for (name, attempts) in self.retry_counters.iter() {
            for _ in 0..*attempts {
                events.push(JournalEvent::RetryIncr { name: name.clone() });
            }
        }
        events
    }
}

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tests;
