// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FSM state tags, shared between the engine (which drives transitions) and
//! the daemon's HTTP status surface (which only ever reads the current tag).

use serde::{Deserialize, Serialize};

/// One state of the upload lifecycle FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FsmState {
    Idle,
    Listening,
    Acquiring,
    Uploading,
    Releasing,
    Cooldown,
    Complete,
    Monitoring,
}

impl FsmState {
    pub fn as_str(self) -> &'static str {
        match self {
            FsmState::Idle => "IDLE",
            FsmState::Listening => "LISTENING",
            FsmState::Acquiring => "ACQUIRING",
            FsmState::Uploading => "UPLOADING",
            FsmState::Releasing => "RELEASING",
            FsmState::Cooldown => "COOLDOWN",
            FsmState::Complete => "COMPLETE",
            FsmState::Monitoring => "MONITORING",
        }
    }
}

impl std::fmt::Display for FsmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
