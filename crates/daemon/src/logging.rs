// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two rotating bounded log files, alternating: once the active file
//! reaches [`CAP_BYTES`], the other file is truncated and becomes active.
//! Intended as the `tracing_appender::non_blocking` writer so the hot path
//! never blocks on file I/O.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

/// Cap per file before rotating to the other one.
const CAP_BYTES: u64 = 20 * 1024;

const NAMES: [&str; 2] = ["syslog.A", "syslog.B"];

pub struct AlternatingBoundedLog {
    dir: PathBuf,
    active: usize,
    file: File,
    written: u64,
}

impl AlternatingBoundedLog {
    /// Open (or resume) the log pair under `dir`. Resumes the more recently
    /// written file as active, so a restart does not spuriously rotate.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let active = Self::pick_active(&dir);
        let file = OpenOptions::new().create(true).append(true).open(dir.join(NAMES[active]))?;
        let written = file.metadata()?.len();
        Ok(Self { dir, active, file, written })
    }

    fn pick_active(dir: &std::path::Path) -> usize {
        let mtime = |name: &str| std::fs::metadata(dir.join(name)).and_then(|m| m.modified()).ok();
        match (mtime(NAMES[0]), mtime(NAMES[1])) {
            (Some(a), Some(b)) if b > a => 1,
            (None, Some(_)) => 1,
            _ => 0,
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.active = 1 - self.active;
        self.file = OpenOptions::new().create(true).write(true).truncate(true).open(self.dir.join(NAMES[self.active]))?;
        self.written = 0;
        Ok(())
    }
}

impl Write for AlternatingBoundedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() as u64 > CAP_BYTES {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
