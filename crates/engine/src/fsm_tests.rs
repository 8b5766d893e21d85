// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn at(hour: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 7, 26, hour, 0, 0).unwrap()
}

fn ctx(hour: u32, in_window: bool, idle: bool) -> TickContext {
    TickContext { now_local: at(hour), in_window, is_idle_for_z: idle }
}

#[test]
fn smart_mode_starts_in_listening_and_scheduled_mode_starts_in_idle() {
    assert_eq!(Fsm::new(UploadMode::Smart).state(), FsmState::Listening);
    assert_eq!(Fsm::new(UploadMode::Scheduled).state(), FsmState::Idle);
}

#[test]
fn scheduled_idle_enters_listening_only_inside_window_and_when_day_not_completed() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.on_tick(ctx(3, false, false));
    assert_eq!(fsm.state(), FsmState::Idle);

    fsm.on_tick(ctx(10, true, false));
    assert_eq!(fsm.state(), FsmState::Listening);
}

#[test]
fn scheduled_idle_stays_idle_once_day_already_completed() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.day.mark_completed(at(10));
    fsm.on_tick(ctx(10, true, false));
    assert_eq!(fsm.state(), FsmState::Idle);
}

#[test]
fn listening_moves_to_acquiring_once_idle_for_z() {
    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_tick(ctx(10, true, true));
    assert_eq!(fsm.state(), FsmState::Acquiring);
}

#[test]
fn scheduled_listening_falls_back_to_idle_when_window_closes() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.on_tick(ctx(10, true, false));
    assert_eq!(fsm.state(), FsmState::Listening);
    fsm.on_tick(ctx(23, false, false));
    assert_eq!(fsm.state(), FsmState::Idle);
}

#[test]
fn smart_listening_never_falls_back_to_idle() {
    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_tick(ctx(3, false, false));
    assert_eq!(fsm.state(), FsmState::Listening);
}

#[test]
fn monitor_request_from_idle_or_listening_goes_to_monitoring() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.on_monitor_request();
    assert_eq!(fsm.state(), FsmState::Monitoring);

    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_monitor_request();
    assert_eq!(fsm.state(), FsmState::Monitoring);
}

#[test]
fn stop_request_from_monitoring_returns_to_listening_in_smart_mode() {
    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_monitor_request();
    fsm.on_stop_request();
    assert_eq!(fsm.state(), FsmState::Listening);
}

#[test]
fn stop_request_from_monitoring_returns_to_idle_in_scheduled_mode() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.on_monitor_request();
    fsm.on_stop_request();
    assert_eq!(fsm.state(), FsmState::Idle);
}

#[test]
fn stop_request_outside_monitoring_is_ignored() {
    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_stop_request();
    assert_eq!(fsm.state(), FsmState::Listening);
}

#[test]
fn acquire_ok_goes_to_uploading_and_fail_goes_to_releasing() {
    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_tick(ctx(10, true, true));
    assert_eq!(fsm.state(), FsmState::Acquiring);
    fsm.on_acquire_result(true);
    assert_eq!(fsm.state(), FsmState::Uploading);

    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_tick(ctx(10, true, true));
    fsm.on_acquire_result(false);
    assert_eq!(fsm.state(), FsmState::Releasing);
}

fn uploading() -> Fsm {
    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_tick(ctx(10, true, true));
    fsm.on_acquire_result(true);
    assert_eq!(fsm.state(), FsmState::Uploading);
    fsm
}

#[test]
fn session_complete_from_uploading_goes_to_complete() {
    let mut fsm = uploading();
    fsm.on_session_result(SessionOutcome::Complete);
    assert_eq!(fsm.state(), FsmState::Complete);
}

#[test]
fn session_timeout_or_error_from_uploading_goes_to_releasing() {
    let mut fsm = uploading();
    fsm.on_session_result(SessionOutcome::Timeout);
    assert_eq!(fsm.state(), FsmState::Releasing);

    let mut fsm = uploading();
    fsm.on_session_result(SessionOutcome::Error);
    assert_eq!(fsm.state(), FsmState::Releasing);
}

#[test]
fn monitor_request_during_uploading_is_deferred_until_session_finishes() {
    let mut fsm = uploading();
    fsm.on_monitor_request();
    assert_eq!(fsm.state(), FsmState::Uploading, "monitor request must not interrupt the active session");
    fsm.on_session_result(SessionOutcome::Complete);
    assert_eq!(fsm.state(), FsmState::Monitoring);
}

#[test]
fn release_done_moves_releasing_to_cooldown() {
    let mut fsm = uploading();
    fsm.on_session_result(SessionOutcome::Timeout);
    assert_eq!(fsm.state(), FsmState::Releasing);
    fsm.on_release_done();
    assert_eq!(fsm.state(), FsmState::Cooldown);
}

#[test]
fn complete_drains_to_releasing_in_smart_mode() {
    let mut fsm = uploading();
    fsm.on_session_result(SessionOutcome::Complete);
    assert_eq!(fsm.state(), FsmState::Complete);
    fsm.drain_complete(at(10));
    assert_eq!(fsm.state(), FsmState::Releasing);
}

#[test]
fn complete_drains_to_idle_and_marks_day_completed_in_scheduled_mode() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.on_tick(ctx(10, true, false));
    fsm.on_tick(ctx(10, true, true));
    fsm.on_acquire_result(true);
    fsm.on_session_result(SessionOutcome::Complete);
    assert_eq!(fsm.state(), FsmState::Complete);

    fsm.drain_complete(at(10));
    assert_eq!(fsm.state(), FsmState::Idle);
    assert!(fsm.day_completed(at(10)));
}

#[test]
fn cooldown_returns_to_listening_in_smart_mode_regardless_of_window() {
    let mut fsm = uploading();
    fsm.on_session_result(SessionOutcome::Timeout);
    fsm.on_release_done();
    fsm.on_cooldown_elapsed(ctx(3, false, false));
    assert_eq!(fsm.state(), FsmState::Listening);
}

#[test]
fn cooldown_returns_to_listening_in_scheduled_mode_only_inside_window_and_day_not_done() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.on_tick(ctx(10, true, false));
    fsm.on_tick(ctx(10, true, true));
    fsm.on_acquire_result(true);
    fsm.on_session_result(SessionOutcome::Timeout);
    fsm.on_release_done();
    assert_eq!(fsm.state(), FsmState::Cooldown);

    fsm.on_cooldown_elapsed(ctx(23, false, false));
    assert_eq!(fsm.state(), FsmState::Idle);
}

#[test]
fn manual_trigger_bypasses_silence_check_from_any_non_uploading_state() {
    let mut fsm = Fsm::new(UploadMode::Scheduled);
    fsm.on_manual_trigger();
    assert_eq!(fsm.state(), FsmState::Acquiring);

    let mut fsm = Fsm::new(UploadMode::Smart);
    fsm.on_manual_trigger();
    assert_eq!(fsm.state(), FsmState::Acquiring);
}

#[test]
fn manual_trigger_is_ignored_while_uploading() {
    let mut fsm = uploading();
    fsm.on_manual_trigger();
    assert_eq!(fsm.state(), FsmState::Uploading);
}
