// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock abstraction.
//!
//! Every component that reasons about time (the Scheduler's window
//! arithmetic, the ActivitySensor's idle accounting, session deadlines)
//! takes a `&dyn Clock` instead of calling `Utc::now()` directly, so tests
//! can drive time deterministically.

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant in the local timezone configured for the device.
    ///
    /// Default implementation converts from [`Clock::now`]; the Scheduler
    /// uses `GMT_OFFSET_HOURS` from config rather than the host's notion of
    /// local time, since the device may have no RTC-backed timezone.
    fn now_local(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }
}

/// Real wall-clock time via the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when explicitly advanced.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    /// Create a fake clock fixed at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Advance the clock by `secs` seconds.
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock();
        *now += chrono::Duration::seconds(secs);
    }

    /// Advance the clock by `ms` milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        let mut now = self.now.lock();
        *now += chrono::Duration::milliseconds(ms);
    }

    /// Set the clock to an absolute instant.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
