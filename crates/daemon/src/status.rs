// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! StatusSnapshot: the read-model behind `GET /status` and `GET /activity`,
//! updated by the Supervisor on every FSM transition and activity sample.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use uo_core::{FsmState, UploadMode};

/// Fixed-capacity ring of recent activity samples kept for `GET /activity`.
/// Bounded rather than a lock-free SPSC ring — not worth the unsafe code
/// at this sample rate.
const ACTIVITY_RING_CAPACITY: usize = 300;

#[derive(Debug, Clone, Serialize)]
pub struct ActivitySamplePoint {
    pub t: i64,
    pub edges: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusBody {
    pub state: &'static str,
    pub state_duration_s: u64,
    pub mode: &'static str,
    pub in_window: bool,
    pub fresh_pending: u64,
    pub old_pending: u64,
    pub session_deadline_s: u64,
    pub heap_free: u64,
    pub heap_max_alloc: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityBody {
    pub monitoring: bool,
    pub current_idle_ms: u64,
    pub longest_idle_ms: u64,
    pub total_active: u64,
    pub total_idle: u64,
    pub samples: Vec<ActivitySamplePoint>,
}

#[derive(Debug, Clone)]
struct Inner {
    state: FsmState,
    state_entered_at_s: i64,
    mode: UploadMode,
    in_window: bool,
    fresh_pending: u64,
    old_pending: u64,
    session_deadline_s: u64,
    monitoring: bool,
    current_idle_ms: u64,
    longest_idle_ms: u64,
    total_active_ms: u64,
    total_idle_ms: u64,
    samples: VecDeque<ActivitySamplePoint>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: FsmState::Idle,
            state_entered_at_s: 0,
            mode: UploadMode::Smart,
            in_window: false,
            fresh_pending: 0,
            old_pending: 0,
            session_deadline_s: 0,
            monitoring: false,
            current_idle_ms: 0,
            longest_idle_ms: 0,
            total_active_ms: 0,
            total_idle_ms: 0,
            samples: VecDeque::with_capacity(ACTIVITY_RING_CAPACITY),
        }
    }
}

/// Shared status handle: the Supervisor writes, the HTTP surface reads.
/// Single writer, briefly locked on both sides.
#[derive(Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Mutex<Inner>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_state_change(&self, state: FsmState, now_unix_s: i64) {
        let mut inner = self.inner.lock();
        inner.state = state;
        inner.state_entered_at_s = now_unix_s;
    }

    pub fn set_mode(&self, mode: UploadMode) {
        self.inner.lock().mode = mode;
    }

    pub fn set_in_window(&self, in_window: bool) {
        self.inner.lock().in_window = in_window;
    }

    pub fn set_pending(&self, fresh: u64, old: u64) {
        let mut inner = self.inner.lock();
        inner.fresh_pending = fresh;
        inner.old_pending = old;
    }

    pub fn set_session_deadline_s(&self, deadline_s: u64) {
        self.inner.lock().session_deadline_s = deadline_s;
    }

    pub fn set_monitoring(&self, monitoring: bool) {
        self.inner.lock().monitoring = monitoring;
    }

    /// Record one activity sample, pushed onto the bounded ring (oldest
    /// evicted once [`ACTIVITY_RING_CAPACITY`] is reached).
    pub fn record_sample(&self, t: i64, edges: u32, active: bool, window_ms: u32, idle_ms: u64) {
        let mut inner = self.inner.lock();
        if active {
            inner.total_active_ms += window_ms as u64;
            inner.current_idle_ms = 0;
        } else {
            inner.total_idle_ms += window_ms as u64;
            inner.current_idle_ms = idle_ms;
            inner.longest_idle_ms = inner.longest_idle_ms.max(idle_ms);
        }
        if inner.samples.len() >= ACTIVITY_RING_CAPACITY {
            inner.samples.pop_front();
        }
        inner.samples.push_back(ActivitySamplePoint { t, edges, active });
    }

    pub fn status(&self, now_unix_s: i64, heap_free: u64, heap_max_alloc: u64) -> StatusBody {
        let inner = self.inner.lock();
        StatusBody {
            state: inner.state.as_str(),
            state_duration_s: now_unix_s.saturating_sub(inner.state_entered_at_s).max(0) as u64,
            mode: match inner.mode {
                UploadMode::Smart => "smart",
                UploadMode::Scheduled => "scheduled",
            },
            in_window: inner.in_window,
            fresh_pending: inner.fresh_pending,
            old_pending: inner.old_pending,
            session_deadline_s: inner.session_deadline_s,
            heap_free,
            heap_max_alloc,
        }
    }

    pub fn activity(&self) -> ActivityBody {
        let inner = self.inner.lock();
        ActivityBody {
            monitoring: inner.monitoring,
            current_idle_ms: inner.current_idle_ms,
            longest_idle_ms: inner.longest_idle_ms,
            total_active: inner.total_active_ms,
            total_idle: inner.total_idle_ms,
            samples: inner.samples.iter().cloned().collect(),
        }
    }

    pub fn state(&self) -> FsmState {
        self.inner.lock().state
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
