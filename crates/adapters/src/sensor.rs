// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ActivitySensor: edge-counting façade over the host-activity sense line.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uo_core::{ActivitySample, ActivitySampleClass, Clock, ConsecutiveIdle};

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("update() called before begin()")]
    SensorUninitialized,
}

/// Edge-counting activity sensor: `update()` samples and zeroes a hardware
/// edge counter every `window_ms`, feeding a [`ConsecutiveIdle`] tracker.
pub trait ActivitySensor: Send + Sync {
    /// Arm the peripheral on `pin`, sampling every `window_ms`.
    fn begin(&self, pin: u32, window_ms: u32) -> Result<(), SensorError>;

    /// Non-blocking: if `window_ms` has elapsed since the last sample, reads
    /// and zeroes the edge count, producing a new sample. Call from the main
    /// loop on every iteration.
    fn update(&self) -> Result<Option<ActivitySample>, SensorError>;

    fn is_idle_for(&self, ms: u32) -> bool;

    fn consecutive_idle_ms(&self) -> u32;

    /// Zero the consecutive-idle accumulator, e.g. on LISTENING entry so
    /// idle time from a prior episode never leaks into the next one.
    fn reset(&self);
}

/// Hardware edge counter over a GPIO-style sense line, read through a
/// caller-supplied closure so the peripheral backend (sysfs, memory-mapped
/// registers, whatever the board support package exposes) stays out of this
/// crate. The counter itself — both-edges counting with a short glitch
/// filter — is assumed to live on the other side of `read_and_zero_edges`.
pub struct HardwareActivitySensor {
    clock: Arc<dyn Clock>,
    read_and_zero_edges: Box<dyn Fn() -> u32 + Send + Sync>,
    window_ms: AtomicU32,
    last_sample_at_ms: AtomicU64,
    begun: std::sync::atomic::AtomicBool,
    idle: parking_lot::Mutex<ConsecutiveIdle>,
}

impl HardwareActivitySensor {
    pub fn new(
        clock: Arc<dyn Clock>,
        read_and_zero_edges: impl Fn() -> u32 + Send + Sync + 'static,
    ) -> Self {
        Self {
            clock,
            read_and_zero_edges: Box::new(read_and_zero_edges),
            window_ms: AtomicU32::new(0),
            last_sample_at_ms: AtomicU64::new(0),
            begun: std::sync::atomic::AtomicBool::new(false),
            idle: parking_lot::Mutex::new(ConsecutiveIdle::default()),
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.now().timestamp_millis().max(0) as u64
    }
}

impl ActivitySensor for HardwareActivitySensor {
    fn begin(&self, _pin: u32, window_ms: u32) -> Result<(), SensorError> {
        self.window_ms.store(window_ms, Ordering::SeqCst);
        self.last_sample_at_ms.store(self.now_ms(), Ordering::SeqCst);
        self.begun.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn update(&self) -> Result<Option<ActivitySample>, SensorError> {
        if !self.begun.load(Ordering::SeqCst) {
            return Err(SensorError::SensorUninitialized);
        }
        let window_ms = self.window_ms.load(Ordering::SeqCst) as u64;
        let now = self.now_ms();
        let last = self.last_sample_at_ms.load(Ordering::SeqCst);
        if now.saturating_sub(last) < window_ms {
            return Ok(None);
        }
        let edge_count = (self.read_and_zero_edges)();
        self.last_sample_at_ms.store(now, Ordering::SeqCst);

        let classification = if edge_count == 0 {
            ActivitySampleClass::Idle
        } else {
            ActivitySampleClass::Active
        };
        let sample = ActivitySample {
            started_at_ms: last,
            window_ms: window_ms as u32,
            edge_count,
            classification,
        };
        self.idle.lock().observe(&sample);
        Ok(Some(sample))
    }

    fn is_idle_for(&self, ms: u32) -> bool {
        self.idle.lock().is_idle_for(ms as u64)
    }

    fn consecutive_idle_ms(&self) -> u32 {
        self.idle.lock().as_ms().min(u32::MAX as u64) as u32
    }

    fn reset(&self) {
        self.idle.lock().reset();
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeActivitySensor {
    idle: parking_lot::Mutex<ConsecutiveIdle>,
    begun: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeActivitySensor {
    fn default() -> Self {
        Self {
            idle: parking_lot::Mutex::new(ConsecutiveIdle::default()),
            begun: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl FakeActivitySensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the sensor with a synthetic sample (test-only; no real
    /// `window_ms` gating since there's no wall clock to race).
    pub fn feed(&self, sample: ActivitySample) {
        self.idle.lock().observe(&sample);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ActivitySensor for FakeActivitySensor {
    fn begin(&self, _pin: u32, _window_ms: u32) -> Result<(), SensorError> {
        self.begun.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn update(&self) -> Result<Option<ActivitySample>, SensorError> {
        if !self.begun.load(Ordering::SeqCst) {
            return Err(SensorError::SensorUninitialized);
        }
        Ok(None)
    }

    fn is_idle_for(&self, ms: u32) -> bool {
        self.idle.lock().is_idle_for(ms as u64)
    }

    fn consecutive_idle_ms(&self) -> u32 {
        self.idle.lock().as_ms().min(u32::MAX as u64) as u32
    }

    fn reset(&self) {
        self.idle.lock().reset();
    }
}

#[cfg(test)]
#[path = "sensor_tests.rs"]
mod tests;
