// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::medium::FakeSourceMedium;
use chrono::TimeZone;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use uo_adapters::{BackendCall, FakeBackendAdapter, FakeBusLines};

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn bus() -> Arc<BusArbiter> {
    Arc::new(BusArbiter::with_settle(Arc::new(FakeBusLines::default()), Arc::new(uo_core::SystemClock), false, Duration::ZERO))
}

#[tokio::test]
async fn fresh_folder_with_one_file_uploads_and_marks_completed() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "data.bin", vec![1, 2, 3, 4]);
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();

    let now = at(2026, 7, 26, 10);
    let result = pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    assert_eq!(result, SessionResult::Complete);
    assert!(store.tables().is_completed("20260725"));
    assert_eq!(share.uploaded_paths(), vec!["20260725/data.bin".to_string()]);
}

#[tokio::test]
async fn unchanged_file_size_is_skipped_on_second_session() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "data.bin", vec![1, 2, 3, 4]);
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let now = at(2026, 7, 26, 10);

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();
    assert_eq!(share.calls().iter().filter(|c| matches!(c, BackendCall::Upload { .. })).count(), 1);

    // Re-run as an "old folder" pass: size unchanged, must not re-upload.
    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();
    assert_eq!(share.calls().iter().filter(|c| matches!(c, BackendCall::Upload { .. })).count(), 1);
}

#[tokio::test]
async fn appended_bytes_after_completion_trigger_a_fresh_upload_of_new_size() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "data.bin", vec![0u8; 1_000_000]);
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium.clone(), bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let now = at(2026, 7, 26, 10);

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();
    assert!(store.tables().is_completed("20260725"));

    medium.append_to("20260725", "data.bin", &[1u8; 1_000]);

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    let fp = store.tables().fingerprint(uo_core::path_hash("20260725/data.bin")).unwrap();
    assert_eq!(fp.size, 1_001_000);
    let uploads: Vec<_> = share
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            BackendCall::Upload { size, .. } => Some(size),
            _ => None,
        })
        .collect();
    assert_eq!(uploads, vec![1_000_000, 1_001_000]);
}

#[tokio::test]
async fn old_phase_is_gated_by_the_daily_window() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260720", "data.bin", vec![9, 9]);
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    // Mark already completed so only the Old phase would touch it.
    store.queue(uo_core::JournalEvent::FolderCompleted { name: "20260720".into() }).unwrap();
    store.flush().unwrap();

    let outside_window = at(2026, 7, 26, 3);
    pipeline
        .run(&mut store, SessionFilter::All, outside_window + chrono::Duration::minutes(30), || outside_window, 8, 22, 30, 365)
        .await
        .unwrap();
    assert!(share.calls().is_empty());

    let inside_window = at(2026, 7, 26, 10);
    pipeline
        .run(&mut store, SessionFilter::All, inside_window + chrono::Duration::minutes(30), || inside_window, 8, 22, 30, 365)
        .await
        .unwrap();
    assert!(!share.calls().is_empty());
}

#[tokio::test]
async fn folder_outside_the_recent_window_is_never_rescanned() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260101", "data.bin", vec![9, 9]);
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium.clone(), bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    store.queue(uo_core::JournalEvent::FolderCompleted { name: "20260101".into() }).unwrap();
    store.flush().unwrap();

    medium.append_to("20260101", "data.bin", &[1]);

    let now = at(2026, 7, 26, 10);
    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    assert!(share.calls().is_empty(), "a folder far outside the recent window must never be rescanned");
}

#[tokio::test]
async fn deadline_mid_folder_returns_timeout_and_still_flushes_progress() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "a.bin", vec![1]);
    medium.put_file("20260725", "b.bin", vec![2]);
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();

    let now = at(2026, 7, 26, 10);
    // Deadline already passed before any file is processed.
    let result = pipeline
        .run(&mut store, SessionFilter::All, now - chrono::Duration::seconds(1), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    assert_eq!(result, SessionResult::Timeout);
}

#[tokio::test]
async fn cloud_import_is_finalized_with_mandatory_files_when_a_folder_completes() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "data.bin", vec![5, 5]);
    medium.put_mandatory("config.json", vec![7, 7, 7]);
    let cloud = FakeBackendAdapter::new("cloud", true);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(cloud.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let now = at(2026, 7, 26, 10);

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    let calls = cloud.calls();
    assert!(calls.contains(&BackendCall::BeginImport));
    assert!(calls.contains(&BackendCall::FinalizeImport));
    assert!(cloud.uploaded_paths().contains(&"config.json".to_string()));
}

#[tokio::test]
async fn finalize_import_is_skipped_when_a_mandatory_file_fails() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "data.bin", vec![5, 5]);
    medium.put_mandatory("config.json", vec![7, 7, 7]);
    let cloud = FakeBackendAdapter::new("cloud", true);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(cloud.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let now = at(2026, 7, 26, 10);

    // The data file uploads fine; only the mandatory file is rejected.
    cloud.set_fail_path("config.json");

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    let calls = cloud.calls();
    assert!(calls.contains(&BackendCall::BeginImport));
    assert!(!calls.contains(&BackendCall::FinalizeImport), "finalize_import must not run when a mandatory file failed");
    assert!(cloud.uploaded_paths().contains(&"20260725/data.bin".to_string()));
    assert!(!cloud.uploaded_paths().contains(&"config.json".to_string()));
}

#[tokio::test]
async fn empty_folder_stays_pending_until_the_policy_period_elapses() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_empty_folder("20260725");
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();

    let first_seen = at(2026, 7, 26, 10);
    pipeline
        .run(&mut store, SessionFilter::All, first_seen + chrono::Duration::minutes(30), move || first_seen, 8, 22, 2, 365)
        .await
        .unwrap();
    assert!(!store.tables().is_completed("20260725"));
    assert!(store.tables().pending_folders.contains(&"20260725".to_string()));

    // Still empty, but short of the policy period: stays pending.
    let almost = first_seen + chrono::Duration::days(6);
    pipeline
        .run(&mut store, SessionFilter::All, almost + chrono::Duration::minutes(30), move || almost, 8, 22, 2, 365)
        .await
        .unwrap();
    assert!(!store.tables().is_completed("20260725"));

    // Past the policy period: now completes.
    let past = first_seen + chrono::Duration::days(7);
    pipeline
        .run(&mut store, SessionFilter::All, past + chrono::Duration::minutes(30), move || past, 8, 22, 2, 365)
        .await
        .unwrap();
    assert!(store.tables().is_completed("20260725"));
    assert!(!store.tables().pending_folders.contains(&"20260725".to_string()));
}

#[tokio::test]
async fn folder_older_than_max_days_is_never_scanned() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20200101", "data.bin", vec![1, 2, 3]);
    let share = FakeBackendAdapter::new("share", false);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(share.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let now = at(2026, 7, 26, 10);

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    assert!(share.calls().is_empty(), "a folder older than max_days must never be scanned");
    assert!(!store.tables().is_completed("20200101"));
}

#[tokio::test]
async fn folder_whose_files_fail_on_every_backend_is_retried_not_completed() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "data.bin", vec![1, 2, 3]);
    let failing = FakeBackendAdapter::new("cloud", true);
    failing.set_fail_uploads(true);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(failing.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let now = at(2026, 7, 26, 10);

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();

    assert!(!store.tables().is_completed("20260725"));
    assert_eq!(store.tables().retry_count("20260725"), 1);
    assert!(store.tables().fingerprint(uo_core::path_hash("20260725/data.bin")).is_none());
}

#[tokio::test]
async fn folder_skipped_once_retry_count_reaches_max_retries() {
    let medium = Arc::new(FakeSourceMedium::new());
    medium.put_file("20260725", "data.bin", vec![1, 2, 3]);
    let failing = FakeBackendAdapter::new("cloud", true);
    failing.set_fail_uploads(true);
    let pipeline = UploadPipeline::new(medium, bus(), vec![Box::new(failing.clone())]);

    let dir = tempdir().unwrap();
    let mut store = StateStore::open(dir.path()).unwrap();
    let now = at(2026, 7, 26, 10);

    for _ in 0..MAX_RETRIES {
        pipeline
            .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
            .await
            .unwrap();
    }
    assert_eq!(store.tables().retry_count("20260725"), MAX_RETRIES);
    let uploads_before = failing.calls().iter().filter(|c| matches!(c, BackendCall::Upload { .. })).count();

    pipeline
        .run(&mut store, SessionFilter::All, now + chrono::Duration::minutes(30), || now, 8, 22, 2, 365)
        .await
        .unwrap();
    let uploads_after = failing.calls().iter().filter(|c| matches!(c, BackendCall::Upload { .. })).count();
    assert_eq!(uploads_after, uploads_before, "folder at MAX_RETRIES must be skipped this session");
}
