// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure window/day-completion arithmetic. Every function here
//! takes its inputs explicitly so the FSM can be driven deterministically
//! in tests without a real clock.

use chrono::{DateTime, Datelike, Local, Timelike};
use uo_core::UploadMode;

/// `start == end` means the window is open 24 hours a day.
pub fn in_window(now_local: DateTime<Local>, start_hour: u8, end_hour: u8) -> bool {
    if start_hour == end_hour {
        return true;
    }
    let hour = now_local.hour() as u8;
    if start_hour <= end_hour {
        start_hour <= hour && hour < end_hour
    } else {
        hour >= start_hour || hour < end_hour
    }
}

pub fn can_upload_fresh(now_local: DateTime<Local>, mode: UploadMode, start_hour: u8, end_hour: u8) -> bool {
    match mode {
        UploadMode::Smart => true,
        UploadMode::Scheduled => in_window(now_local, start_hour, end_hour),
    }
}

pub fn can_upload_old(now_local: DateTime<Local>, start_hour: u8, end_hour: u8) -> bool {
    in_window(now_local, start_hour, end_hour)
}

/// Tracks whether a full upload pass has already completed on the current
/// local day; cleared the moment a new local day begins.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayCompletion {
    last_completed_yday: Option<(i32, u32)>,
}

impl DayCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if a completion was already recorded on `now_local`'s date.
    pub fn day_completed(&self, now_local: DateTime<Local>) -> bool {
        self.last_completed_yday == Some((now_local.year(), now_local.ordinal()))
    }

    /// Record today's completion.
    pub fn mark_completed(&mut self, now_local: DateTime<Local>) {
        self.last_completed_yday = Some((now_local.year(), now_local.ordinal()));
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
