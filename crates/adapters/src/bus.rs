// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! BusArbiter: owns the shared-bus mux, the single point of contention
//! between the host and this device for the storage medium.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uo_core::{BusOwnership, Clock};

/// Soft-reset command frame (`CMD0`), clocked bit-by-bit on the command line
/// on release to force the storage device's internal state machine back to
/// idle before handing the mux to the host.
pub const SOFT_RESET_FRAME: [u8; 6] = [0x40, 0x00, 0x00, 0x00, 0x00, 0x95];

const SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus already held by another acquirer")]
    BusBusy,
}

/// Line-level operations the arbiter drives. Implemented by the board
/// support layer; this crate only owns sequencing and bookkeeping.
pub trait BusLines: Send + Sync {
    fn drive_mux(&self, ownership: BusOwnership);
    fn unmount_shared_medium(&self);
    /// Clock [`SOFT_RESET_FRAME`] onto the command line.
    fn send_soft_reset_frame(&self, frame: [u8; 6]);
}

struct ArbiterInner {
    lines: Box<dyn BusLines>,
    clock: Arc<dyn Clock>,
    enable_reset_frame: bool,
    settle: Duration,
}

/// Mediates all access to the shared-bus mux. At most one side owns the bus
/// at any wall-clock instant; enforced by `held` plus the RAII guard.
pub struct BusArbiter {
    inner: Arc<ArbiterInner>,
    held: AtomicBool,
    hold_started_at_ms: Mutex<Option<u64>>,
}

impl BusArbiter {
    pub fn new(lines: impl BusLines + 'static, clock: Arc<dyn Clock>, enable_reset_frame: bool) -> Self {
        Self::with_settle(lines, clock, enable_reset_frame, SETTLE)
    }

    /// Like [`BusArbiter::new`] but with an overridable settle duration, so
    /// tests don't pay the real ~500 ms hardware settle delay.
    pub fn with_settle(
        lines: impl BusLines + 'static,
        clock: Arc<dyn Clock>,
        enable_reset_frame: bool,
        settle: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ArbiterInner {
                lines: Box::new(lines),
                clock,
                enable_reset_frame,
                settle,
            }),
            held: AtomicBool::new(false),
            hold_started_at_ms: Mutex::new(None),
        }
    }

    /// Drive the mux to SELF, settle, and return an RAII guard. Fails with
    /// [`BusError::BusBusy`] if another acquirer already holds the bus.
    pub fn acquire(&self) -> Result<BusGuard<'_>, BusError> {
        if self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BusError::BusBusy);
        }
        self.inner.lines.drive_mux(BusOwnership::SelfOwned);
        std::thread::sleep(self.inner.settle);
        let now_ms = self.inner.clock.now().timestamp_millis().max(0) as u64;
        *self.hold_started_at_ms.lock() = Some(now_ms);
        info!("bus acquired");
        Ok(BusGuard { arbiter: self })
    }

    fn release(&self) -> u64 {
        self.inner.lines.unmount_shared_medium();
        if self.inner.enable_reset_frame {
            self.inner.lines.send_soft_reset_frame(SOFT_RESET_FRAME);
        }
        self.inner.lines.drive_mux(BusOwnership::Host);

        let started = self.hold_started_at_ms.lock().take();
        let now_ms = self.inner.clock.now().timestamp_millis().max(0) as u64;
        let hold_ms = started.map(|s| now_ms.saturating_sub(s)).unwrap_or(0);
        self.held.store(false, Ordering::SeqCst);
        info!(hold_ms, "bus released");
        hold_ms
    }
}

/// RAII guard for bus ownership. Dropping it unmounts the filesystem,
/// optionally emits the soft-reset frame, then releases the mux to HOST.
///
/// No file handle obtained while this guard is alive may outlive it; the
/// FSM and UploadPipeline are responsible for closing every file before
/// the guard drops.
pub struct BusGuard<'a> {
    arbiter: &'a BusArbiter,
}

impl BusGuard<'_> {
    /// Release early, returning the bus-hold duration in milliseconds so
    /// the caller can fold it into `SessionStats::record_hold`.
    pub fn release(self) -> u64 {
        let hold_ms = self.arbiter.release();
        std::mem::forget(self);
        hold_ms
    }
}

impl Drop for BusGuard<'_> {
    fn drop(&mut self) {
        if self.arbiter.held.load(Ordering::SeqCst) {
            let hold_ms = self.arbiter.release();
            warn!(hold_ms, "bus guard dropped without explicit release");
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeBusLines {
    pub driven: Mutex<Vec<BusOwnership>>,
    pub unmounts: std::sync::atomic::AtomicU32,
    pub reset_frames_sent: std::sync::atomic::AtomicU32,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeBusLines {
    fn default() -> Self {
        Self {
            driven: Mutex::new(Vec::new()),
            unmounts: std::sync::atomic::AtomicU32::new(0),
            reset_frames_sent: std::sync::atomic::AtomicU32::new(0),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl BusLines for FakeBusLines {
    fn drive_mux(&self, ownership: BusOwnership) {
        self.driven.lock().push(ownership);
    }

    fn unmount_shared_medium(&self) {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
    }

    fn send_soft_reset_frame(&self, frame: [u8; 6]) {
        assert_eq!(frame, SOFT_RESET_FRAME);
        self.reset_frames_sent.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl BusLines for Arc<FakeBusLines> {
    fn drive_mux(&self, ownership: BusOwnership) {
        FakeBusLines::drive_mux(self, ownership);
    }

    fn unmount_shared_medium(&self) {
        FakeBusLines::unmount_shared_medium(self);
    }

    fn send_soft_reset_frame(&self, frame: [u8; 6]) {
        FakeBusLines::send_soft_reset_frame(self, frame);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
