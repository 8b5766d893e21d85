// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FSM: the lifecycle driver. Consumes pre-computed
//! Scheduler/ActivitySensor decisions rather than owning either
//! dependency, so the transition table can be tested as pure data.

use crate::scheduler::DayCompletion;
use chrono::{DateTime, Local};
use tracing::info;
use uo_core::{FsmState, UploadMode};

/// Everything the FSM needs to know about "now" to evaluate a tick. Built
/// by the caller from Scheduler + ActivitySensor reads.
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub now_local: DateTime<Local>,
    pub in_window: bool,
    pub is_idle_for_z: bool,
}

/// What the UploadPipeline reported back for the just-finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Complete,
    Timeout,
    Error,
}

pub struct Fsm {
    state: FsmState,
    mode: UploadMode,
    day: DayCompletion,
    /// Set when a monitor-request arrives mid-UPLOADING; consumed once the
    /// session finishes to redirect into MONITORING instead of the normal
    /// COMPLETE/RELEASING path.
    monitor_pending: bool,
}

impl Fsm {
    /// Initial state: LISTENING in smart mode, IDLE in scheduled mode. IDLE
    /// is unreachable in smart mode thereafter.
    pub fn new(mode: UploadMode) -> Self {
        let state = match mode {
            UploadMode::Smart => FsmState::Listening,
            UploadMode::Scheduled => FsmState::Idle,
        };
        Self { state, mode, day: DayCompletion::new(), monitor_pending: false }
    }

    pub fn state(&self) -> FsmState {
        self.state
    }

    fn transition(&mut self, to: FsmState) {
        info!(from = %self.state, to = %to, "fsm transition");
        self.state = to;
    }

    /// Drive a periodic tick. Only IDLE and LISTENING react to ticks.
    pub fn on_tick(&mut self, ctx: TickContext) {
        match self.state {
            FsmState::Idle => {
                if self.mode == UploadMode::Scheduled
                    && ctx.in_window
                    && !self.day.day_completed(ctx.now_local)
                {
                    self.transition(FsmState::Listening);
                }
            }
            FsmState::Listening => {
                if ctx.is_idle_for_z {
                    self.transition(FsmState::Acquiring);
                } else if self.mode == UploadMode::Scheduled && !ctx.in_window {
                    self.transition(FsmState::Idle);
                }
            }
            _ => {}
        }
    }

    /// Operator-initiated: jump straight to ACQUIRING from any
    /// non-UPLOADING state, bypassing the silence check.
    pub fn on_manual_trigger(&mut self) {
        if self.state != FsmState::Uploading {
            self.transition(FsmState::Acquiring);
        }
    }

    pub fn on_monitor_request(&mut self) {
        match self.state {
            FsmState::Idle | FsmState::Listening => self.transition(FsmState::Monitoring),
            FsmState::Uploading => self.monitor_pending = true,
            _ => {}
        }
    }

    /// Leave MONITORING back to the mode's normal resting state: IDLE is
    /// unreachable in smart mode, so smart-mode FSMs return to LISTENING
    /// instead.
    pub fn on_stop_request(&mut self) {
        if self.state == FsmState::Monitoring {
            let resting = match self.mode {
                UploadMode::Smart => FsmState::Listening,
                UploadMode::Scheduled => FsmState::Idle,
            };
            self.transition(resting);
        }
    }

    pub fn on_acquire_result(&mut self, ok: bool) {
        if self.state != FsmState::Acquiring {
            return;
        }
        self.transition(if ok { FsmState::Uploading } else { FsmState::Releasing });
    }

    /// The UploadPipeline has finished (or was interrupted by a
    /// monitor-request it chose to honor after finishing the current file
    /// and mandatory uploads).
    pub fn on_session_result(&mut self, outcome: SessionOutcome) {
        if self.state != FsmState::Uploading {
            return;
        }
        if self.monitor_pending {
            self.monitor_pending = false;
            self.transition(FsmState::Monitoring);
            return;
        }
        match outcome {
            SessionOutcome::Complete => self.transition(FsmState::Complete),
            SessionOutcome::Timeout | SessionOutcome::Error => self.transition(FsmState::Releasing),
        }
    }

    pub fn on_release_done(&mut self) {
        if self.state == FsmState::Releasing {
            self.transition(FsmState::Cooldown);
        }
    }

    /// COMPLETE has no event of its own: it transitions immediately based
    /// on mode, so the caller drives it right after `on_session_result`
    /// lands on COMPLETE.
    pub fn drain_complete(&mut self, now_local: DateTime<Local>) {
        if self.state != FsmState::Complete {
            return;
        }
        match self.mode {
            UploadMode::Smart => self.transition(FsmState::Releasing),
            UploadMode::Scheduled => {
                self.day.mark_completed(now_local);
                self.transition(FsmState::Idle);
            }
        }
    }

    pub fn on_cooldown_elapsed(&mut self, ctx: TickContext) {
        if self.state != FsmState::Cooldown {
            return;
        }
        let go_listening =
            self.mode == UploadMode::Smart || (ctx.in_window && !self.day.day_completed(ctx.now_local));
        self.transition(if go_listening { FsmState::Listening } else { FsmState::Idle });
    }

    pub fn day_completed(&self, now_local: DateTime<Local>) -> bool {
        self.day.day_completed(now_local)
    }
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
