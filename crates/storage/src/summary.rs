// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `summary.current`: the single most recent [`SessionStats`], persisted
//! outside the compactable journal/snapshot stream. Unlike the
//! StateTables it is overwritten wholesale on every session end rather than
//! folded, so it never needs a cap or an eviction policy of its own.

use crate::error::StorageError;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use uo_core::SessionStats;

pub fn write(path: &Path, stats: &SessionStats) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        let bytes = serde_json::to_vec(stats)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Option<SessionStats>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
