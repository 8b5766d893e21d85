// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session aggregate statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate counters for one upload session, persisted as a summary line
/// after session end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub bytes_read: u64,
    pub bytes_uploaded: u64,
    pub files_attempted: u32,
    pub files_succeeded: u32,
    pub hold_ms_total: u64,
    pub hold_ms_longest: u64,
    pub holds_count: u32,
    /// Total milliseconds the host appliance was observed ACTIVE during the
    /// session window (spec's `cpap_ms_total`), tracked for the operator
    /// dashboard's "host busy" indicator.
    pub host_active_ms_total: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            started_at: DateTime::<Utc>::UNIX_EPOCH,
            bytes_read: 0,
            bytes_uploaded: 0,
            files_attempted: 0,
            files_succeeded: 0,
            hold_ms_total: 0,
            hold_ms_longest: 0,
            holds_count: 0,
            host_active_ms_total: 0,
        }
    }
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ..Self::default()
        }
    }

    /// Record one bus hold of `hold_ms` milliseconds.
    pub fn record_hold(&mut self, hold_ms: u64) {
        self.hold_ms_total += hold_ms;
        self.hold_ms_longest = self.hold_ms_longest.max(hold_ms);
        self.holds_count += 1;
    }

    /// Record one file upload attempt, succeeded or not.
    pub fn record_file_attempt(&mut self, succeeded: bool, bytes: u64) {
        self.files_attempted += 1;
        self.bytes_read += bytes;
        if succeeded {
            self.files_succeeded += 1;
            self.bytes_uploaded += bytes;
        }
    }

    /// Accumulate host-active time observed by the ActivitySensor while
    /// this session's window was open.
    pub fn record_host_active(&mut self, ms: u64) {
        self.host_active_ms_total += ms;
    }
}

#[cfg(test)]
#[path = "session_stats_tests.rs"]
mod tests;
