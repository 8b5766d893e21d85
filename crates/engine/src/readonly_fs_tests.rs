// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::tempdir;
use uo_adapters::{BusArbiter, FakeBusLines};

#[derive(Default)]
struct FakeMount {
    mounts: AtomicU32,
    remounts_rw: AtomicU32,
    remounts_ro: AtomicU32,
    unmounts: AtomicU32,
}

impl MountOps for Arc<FakeMount> {
    fn mount_ro(&self) -> Result<(), ReadOnlyFsError> {
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn remount_rw(&self) -> Result<(), ReadOnlyFsError> {
        self.remounts_rw.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn remount_ro(&self) -> Result<(), ReadOnlyFsError> {
        self.remounts_ro.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn unmount(&self) -> Result<(), ReadOnlyFsError> {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn mount_ro_then_drop_unmounts_exactly_once() {
    let mount = Arc::new(FakeMount::default());
    let fs = ReadOnlyFs::new(mount.clone());
    {
        let _handle = fs.mount_ro().unwrap();
        assert_eq!(mount.mounts.load(Ordering::SeqCst), 1);
        assert_eq!(mount.unmounts.load(Ordering::SeqCst), 0);
    }
    assert_eq!(mount.unmounts.load(Ordering::SeqCst), 1);
}

#[test]
fn remount_rw_briefly_writes_payload_and_restores_read_only() {
    let mount = Arc::new(FakeMount::default());
    let fs = ReadOnlyFs::new(mount.clone());

    let lines = Arc::new(FakeBusLines::default());
    let clock: Arc<dyn uo_core::Clock> = Arc::new(uo_core::SystemClock);
    let arbiter = BusArbiter::with_settle(lines, clock, false, std::time::Duration::ZERO);
    let guard = arbiter.acquire().unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.txt");
    fs.remount_rw_briefly(&guard, &path, b"UPLOAD_MODE = scheduled\n").unwrap();

    assert_eq!(mount.remounts_rw.load(Ordering::SeqCst), 1);
    assert_eq!(mount.remounts_ro.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&path).unwrap(), b"UPLOAD_MODE = scheduled\n");
}

#[test]
fn handle_lifetime_is_independent_per_mount() {
    let mount = Arc::new(FakeMount::default());
    let fs = ReadOnlyFs::new(mount.clone());
    fs.mount_ro().unwrap();
    fs.mount_ro().unwrap();
    assert_eq!(mount.mounts.load(Ordering::SeqCst), 2);
    assert_eq!(mount.unmounts.load(Ordering::SeqCst), 2);
}
