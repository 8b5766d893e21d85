// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data folder naming and lifecycle.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one `YYYYMMDD` data folder on the shared medium.
///
/// See the module-level state diagram and the recent-window invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderLifecycle {
    Unseen,
    Scanning,
    Uploading,
    /// No payload files found yet; carries the epoch-ms timestamp it was
    /// first observed empty, so the policy period can be measured.
    PendingEmpty,
    Completed,
}

/// A `YYYYMMDD`-named directory on the shared medium and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFolder {
    pub name: String,
    pub lifecycle: FolderLifecycle,
}

impl DataFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: FolderLifecycle::Unseen,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        parse_folder_date(&self.name)
    }
}

/// Parse a folder name of form `YYYYMMDD` into a date, or `None` if it does
/// not match (the scanner silently ignores non-conforming directory names).
pub fn parse_folder_date(name: &str) -> Option<NaiveDate> {
    if !is_folder_name(name) {
        return None;
    }
    let year: i32 = name[0..4].parse().ok()?;
    let month: u32 = name[4..6].parse().ok()?;
    let day: u32 = name[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whether `name` has the literal shape `YYYYMMDD` (8 ASCII digits).
pub fn is_folder_name(name: &str) -> bool {
    name.len() == 8 && name.bytes().all(|b| b.is_ascii_digit())
}

/// Age of a data folder in whole days relative to `today`.
///
/// Returns `None` if the name does not parse as a date (treated as
/// "not a recognized data folder" by the scanner, never as an error).
pub fn folder_age_days(name: &str, today: NaiveDate) -> Option<i64> {
    let date = parse_folder_date(name)?;
    Some((today - date).num_days())
}

#[cfg(test)]
#[path = "folder_tests.rs"]
mod tests;
