// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: the main loop. Drives the FSM's periodic tick, dispatches
//! the upload worker onto its own task while continuing to service the
//! activity sensor and HTTP status surface, and watches the software
//! heartbeat for a fatal stall.

use crate::boot;
use crate::status::StatusHandle;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uo_adapters::{ActivitySensor, BusArbiter, BusError};
use uo_core::{BootReason, BootReasonKind, Clock, Config, FsmState};
use uo_engine::fsm::{Fsm, SessionOutcome, TickContext};
use uo_engine::readonly_fs::{MountOps, ReadOnlyFs};
use uo_engine::scheduler;
use uo_engine::{SessionFilter, SessionResult, UploadPipeline};
use uo_storage::StateStore;

/// Main-loop cadence: how often `tick()` evaluates the FSM and samples
/// activity.
const TICK_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("storage error: {0}")]
    Storage(#[from] uo_storage::StorageError),
    #[error("sensor error: {0}")]
    Sensor(#[from] uo_adapters::SensorError),
    #[error("boot reason persistence failed: {0}")]
    BootReason(#[from] crate::boot::BootReasonError),
    #[error("software heartbeat stale beyond the fatal timeout")]
    WatchdogStale,
    #[error("trigger refused: scheduled mode is outside the upload window")]
    TriggerRefusedOutsideWindow,
}

pub struct Supervisor<M: MountOps + 'static> {
    config: Config,
    state_dir: PathBuf,
    clock: Arc<dyn Clock>,
    sensor: Arc<dyn ActivitySensor>,
    bus: Arc<BusArbiter>,
    fs: ReadOnlyFs<M>,
    pipeline: UploadPipeline,
    fsm: Mutex<Fsm>,
    store: AsyncMutex<StateStore>,
    status: StatusHandle,
    heartbeat_ms: AtomicU64,
    cooldown_until: Mutex<Option<DateTime<Utc>>>,
    upload_task: Mutex<Option<JoinHandle<SessionResult>>>,
    watchdog_fatal_secs: u64,
    self_ref: Weak<Supervisor<M>>,
}

impl<M: MountOps + 'static> Supervisor<M> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        state_dir: PathBuf,
        clock: Arc<dyn Clock>,
        sensor: Arc<dyn ActivitySensor>,
        bus: Arc<BusArbiter>,
        fs: ReadOnlyFs<M>,
        pipeline: UploadPipeline,
        store: StateStore,
        status: StatusHandle,
        watchdog_fatal_secs: u64,
    ) -> Arc<Self> {
        let mode = config.upload_mode;
        let fsm = Fsm::new(mode);
        status.set_mode(mode);
        status.on_state_change(fsm.state(), clock.now().timestamp());
        let now_ms = clock.now().timestamp_millis().max(0) as u64;
        Arc::new_cyclic(|weak| Self {
            config,
            state_dir,
            clock,
            sensor,
            bus,
            fs,
            pipeline,
            fsm: Mutex::new(fsm),
            store: AsyncMutex::new(store),
            status,
            heartbeat_ms: AtomicU64::new(now_ms),
            cooldown_until: Mutex::new(None),
            upload_task: Mutex::new(None),
            watchdog_fatal_secs,
            self_ref: weak.clone(),
        })
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    fn feed_heartbeat(&self) {
        let now_ms = self.clock.now().timestamp_millis().max(0) as u64;
        self.heartbeat_ms.store(now_ms, Ordering::SeqCst);
    }

    fn heartbeat_age_ms(&self) -> u64 {
        let now_ms = self.clock.now().timestamp_millis().max(0) as u64;
        now_ms.saturating_sub(self.heartbeat_ms.load(Ordering::SeqCst))
    }

    fn in_window(&self) -> bool {
        scheduler::in_window(self.clock.now_local(), self.config.upload_start_hour, self.config.upload_end_hour)
    }

    /// Run the main loop until a fatal condition is hit. Callers own the
    /// reboot decision on `Err`: in production this triggers a clean
    /// restart; in this host binary it is surfaced as a process exit.
    pub async fn run(self: Arc<Self>) -> Result<(), SupervisorError> {
        self.sensor.begin(0, self.config.inactivity_ms())?;
        loop {
            self.tick().await?;
            if self.heartbeat_age_ms() > self.watchdog_fatal_secs * 1000 {
                boot::write(&self.state_dir, &BootReason::new(BootReasonKind::WatchdogKill, self.clock.now()))
                    .map_err(SupervisorError::BootReason)?;
                error!("software heartbeat stale beyond fatal timeout, requesting clean reboot");
                return Err(SupervisorError::WatchdogStale);
            }
            tokio::time::sleep(TICK_INTERVAL).await;
        }
    }

    async fn tick(&self) -> Result<(), SupervisorError> {
        self.feed_heartbeat();

        let state_before = self.fsm.lock().state();

        if let Some(sample) = self.sensor.update()? {
            let idle_ms = self.sensor.consecutive_idle_ms() as u64;
            self.status.record_sample(self.clock.now().timestamp(), sample.edge_count, !sample.is_idle(), sample.window_ms, idle_ms);
            if !sample.is_idle() && state_before == FsmState::Uploading {
                self.pipeline.record_host_active(sample.window_ms as u64);
            }
        }

        let now_local = self.clock.now_local();
        let ctx = TickContext {
            now_local,
            in_window: self.in_window(),
            is_idle_for_z: self.sensor.is_idle_for(self.config.inactivity_ms()),
        };
        self.status.set_in_window(ctx.in_window);

        self.fsm.lock().on_tick(ctx);
        self.maybe_finish_upload().await;
        let state_after = self.fsm.lock().state();
        if state_after != state_before {
            if state_after == FsmState::Listening {
                self.sensor.reset();
            }
            self.status.on_state_change(state_after, self.clock.now().timestamp());
        }

        match state_after {
            FsmState::Acquiring => self.handle_acquiring().await,
            FsmState::Releasing => {
                self.fsm.lock().on_release_done();
                self.status.on_state_change(self.fsm.lock().state(), self.clock.now().timestamp());
            }
            FsmState::Complete => {
                self.fsm.lock().drain_complete(now_local);
                self.status.on_state_change(self.fsm.lock().state(), self.clock.now().timestamp());
            }
            FsmState::Cooldown => self.handle_cooldown(ctx),
            _ => {}
        }

        Ok(())
    }

    async fn handle_acquiring(&self) {
        let ok = match self.bus.acquire() {
            Ok(guard) => {
                guard.release();
                true
            }
            Err(BusError::BusBusy) => false,
        };
        self.fsm.lock().on_acquire_result(ok);
        let state = self.fsm.lock().state();
        self.status.on_state_change(state, self.clock.now().timestamp());
        if state == FsmState::Uploading {
            self.spawn_upload_session();
        }
    }

    fn spawn_upload_session(&self) {
        let Some(this) = self.self_ref.upgrade() else {
            warn!("supervisor dropped before upload session could be spawned");
            return;
        };
        let now_local = self.clock.now_local();
        let deadline = now_local + chrono::Duration::minutes(this.config.exclusive_access_minutes as i64);
        this.status.set_session_deadline_s(this.config.exclusive_access_minutes as u64 * 60);

        let handle = tokio::spawn(async move {
            let _mount = match this.fs.mount_ro() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "failed to mount shared medium read-only, skipping session");
                    return SessionResult::Error;
                }
            };
            let mut store = this.store.lock().await;
            let clock = Arc::clone(&this.clock);
            let result = this
                .pipeline
                .run(
                    &mut *store,
                    SessionFilter::All,
                    deadline,
                    || clock.now_local(),
                    this.config.upload_start_hour,
                    this.config.upload_end_hour,
                    this.config.recent_folder_days,
                    this.config.max_days,
                )
                .await;
            match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "upload session failed with a hard error");
                    SessionResult::Error
                }
            }
        });
        *self.upload_task.lock() = Some(handle);
    }

    async fn maybe_finish_upload(&self) {
        let finished = {
            let mut slot = self.upload_task.lock();
            match slot.as_ref() {
                Some(handle) if handle.is_finished() => slot.take(),
                _ => None,
            }
        };
        let Some(handle) = finished else { return };
        let outcome = match handle.await {
            Ok(SessionResult::Complete) => SessionOutcome::Complete,
            Ok(SessionResult::Timeout) => SessionOutcome::Timeout,
            Ok(SessionResult::Error) => SessionOutcome::Error,
            Err(e) => {
                error!(error = %e, "upload worker task panicked or was cancelled");
                SessionOutcome::Error
            }
        };
        self.fsm.lock().on_session_result(outcome);
        info!(?outcome, "upload session finished");
    }

    fn handle_cooldown(&self, ctx: TickContext) {
        let mut deadline = self.cooldown_until.lock();
        match *deadline {
            None => {
                *deadline = Some(self.clock.now() + chrono::Duration::minutes(self.config.cooldown_minutes as i64));
            }
            Some(at) if self.clock.now() >= at => {
                *deadline = None;
                drop(deadline);
                self.fsm.lock().on_cooldown_elapsed(ctx);
                let state = self.fsm.lock().state();
                if state == FsmState::Listening {
                    self.sensor.reset();
                }
                self.status.on_state_change(state, self.clock.now().timestamp());
            }
            Some(_) => {}
        }
    }

    /// `POST /trigger` — refused outside the scheduled-mode window.
    pub fn trigger(&self) -> Result<(), SupervisorError> {
        if self.config.upload_mode == uo_core::UploadMode::Scheduled && !self.in_window() {
            return Err(SupervisorError::TriggerRefusedOutsideWindow);
        }
        self.fsm.lock().on_manual_trigger();
        Ok(())
    }

    pub fn monitor_start(&self) {
        self.fsm.lock().on_monitor_request();
        self.status.set_monitoring(true);
    }

    pub fn monitor_stop(&self) {
        self.fsm.lock().on_stop_request();
        self.status.set_monitoring(false);
    }

    /// `POST /reset-state` — persists a flag rather than clearing
    /// StateStore in-line, so a live session is never torn down mid-I/O.
    pub fn request_reset(&self) -> Result<(), SupervisorError> {
        boot::write(&self.state_dir, &BootReason::new(BootReasonKind::StateResetRequested, self.clock.now()))?;
        Ok(())
    }

    pub fn status_body(&self) -> crate::status::StatusBody {
        self.status.status(self.clock.now().timestamp(), 0, 0)
    }

    pub fn activity_body(&self) -> crate::status::ActivityBody {
        self.status.activity()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
