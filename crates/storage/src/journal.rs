// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL journal for [`JournalEvent`]s.
//!
//! Durability point is [`Journal::flush`]; nothing before that call is
//! guaranteed to survive a crash. Flush cadence is
//! end-of-batch/folder/session — never per file — so this type buffers in
//! RAM until the caller explicitly flushes.

use crate::error::StorageError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use uo_core::JournalEvent;

pub struct Journal {
    file: File,
    path: PathBuf,
    buffer: Vec<JournalEvent>,
    /// Count of lines written to disk since the journal was last truncated
    /// (i.e. since the last snapshot). Used by StateStore to decide when
    /// to compact.
    written_since_snapshot: u64,
}

impl Journal {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).read(true).append(true).open(path)?;
        let written_since_snapshot = count_lines(path)?;
        Ok(Self {
            file,
            path: path.to_owned(),
            buffer: Vec::new(),
            written_since_snapshot,
        })
    }

    /// Queue an event in RAM. Not durable until [`Journal::flush`].
    pub fn append(&mut self, event: JournalEvent) {
        self.buffer.push(event);
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn written_since_snapshot(&self) -> u64 {
        self.written_since_snapshot
    }

    /// Write all buffered events in one append, then fsync.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        for event in self.buffer.drain(..) {
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            self.file.write_all(&line)?;
            self.written_since_snapshot += 1;
        }
        self.file.sync_all()?;
        Ok(())
    }

    /// Replace the on-disk journal with an empty file, called right after a
    /// snapshot has durably absorbed everything written so far.
    pub fn truncate(&mut self) -> Result<(), StorageError> {
        self.flush()?;
        self.file = File::create(&self.path)?;
        self.file.sync_all()?;
        self.written_since_snapshot = 0;
        Ok(())
    }

    /// Load and replay every complete line currently on disk.
    ///
    /// An interrupted final append (no trailing newline, or an unparseable
    /// trailing line) is discarded rather than treated as an error — the
    /// loader proceeds with the valid prefix.
    pub fn replay(path: &Path) -> Result<Vec<JournalEvent>, StorageError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut text = String::new();
        File::open(path)?.read_to_string(&mut text)?;

        let ends_with_newline = text.ends_with('\n');
        let mut lines: Vec<&str> = text.split('\n').filter(|l| !l.is_empty()).collect();
        if !ends_with_newline && !lines.is_empty() {
            // Drop the trailing, presumably torn, partial line.
            lines.pop();
        }

        let mut events = Vec::with_capacity(lines.len());
        for line in lines {
            match serde_json::from_str::<JournalEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(error = %e, "corrupt journal entry, stopping replay at corruption point");
                    break;
                }
            }
        }
        Ok(events)
    }
}

fn count_lines(path: &Path) -> Result<u64, StorageError> {
    if !path.exists() {
        return Ok(0);
    }
    let mut text = String::new();
    File::open(path)?.read_to_string(&mut text)?;
    Ok(text.lines().count() as u64)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
