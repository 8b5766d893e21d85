// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted next-boot diagnostic record.
//!
//! The one exception to "no global mutable singletons": a small
//! flag written just before a planned reboot so the Supervisor can explain,
//! on the next boot, why it happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootReasonKind {
    WatchdogKill,
    StateResetRequested,
    StorageFatal,
    Clean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootReason {
    pub reason: BootReasonKind,
    pub at: DateTime<Utc>,
}

impl BootReason {
    pub fn new(reason: BootReasonKind, at: DateTime<Utc>) -> Self {
        Self { reason, at }
    }
}
