// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal event types appended to the StateStore's write-ahead log.

use crate::session_stats::SessionStats;
use serde::{Deserialize, Serialize};

/// One durable fact recorded by the StateStore.
///
/// Serializes as a tagged JSON object, one per line (JSONL), matching the
/// private-filesystem journal format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JournalEvent {
    FolderCompleted { name: String },
    FileUploaded {
        path_hash: u64,
        size: u64,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        checksum: Option<String>,
    },
    PendingSeen { name: String, seen_at_ms: u64 },
    RetryIncr { name: String },
    SessionSummary { stats: SessionStats },
}

#[cfg(test)]
#[path = "journal_event_tests.rs"]
mod tests;
