// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-safe, bounded-memory persistence for the upload orchestration core.
//!
//! Layered as: [`bounded::BoundedMap`] (insertion-ordered eviction) under
//! [`tables::StateTables`] (the four StateTable collections), replayed from
//! [`journal::Journal`] + [`snapshot`], and tied together by [`store::StateStore`].

mod bounded;
mod error;
mod journal;
mod snapshot;
mod store;
mod summary;
mod tables;

pub use bounded::BoundedMap;
pub use error::StorageError;
pub use journal::Journal;
pub use store::{StateStore, COMPACTION_THRESHOLD};
pub use tables::{
    StateTables, COMPLETED_FOLDERS_CAP, FILE_FINGERPRINTS_CAP, PENDING_FOLDERS_CAP,
    RETRY_COUNTERS_CAP,
};
