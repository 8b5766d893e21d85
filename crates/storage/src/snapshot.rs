// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! A snapshot is the same typed-line format as the journal:
//! the current [`StateTables`] re-expressed as the sequence of events that
//! would reconstruct them. Loading a snapshot is therefore just another
//! replay; `load` + `replay(journal)` always yields an equivalent table.

use crate::error::StorageError;
use crate::journal::Journal;
use crate::tables::StateTables;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Write the current tables as a fresh snapshot, atomically (tmp + rename)
/// so a crash mid-write never corrupts the previous snapshot.
pub fn save(tables: &StateTables, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        for event in tables.to_events() {
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            file.write_all(&line)?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a snapshot, replaying its lines into a fresh [`StateTables`].
///
/// Reuses [`Journal::replay`]'s torn-line tolerance since the formats are
/// identical. A missing file yields an empty table, not an error.
pub fn load(path: &Path) -> Result<StateTables, StorageError> {
    let events = Journal::replay(path)?;
    let mut tables = StateTables::new();
    let none = HashSet::new();
    for event in events {
        tables.apply(&event, &none);
    }
    Ok(tables)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
