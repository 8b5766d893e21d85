// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File change-detection fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A stable, fixed-width hash of a source path, used as the StateTable key.
///
/// Paths on the shared medium are short (appliance folder/file naming is
/// rigid) but hashing avoids ever storing the literal path in the private
/// journal, which keeps entries a uniform size.
pub fn path_hash(path: &str) -> u64 {
    let digest = Sha256::digest(path.as_bytes());
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest >= 8 bytes"))
}

/// Per-file change-detection record.
///
/// `checksum` is `None` for append-only data files (size-only change
/// detection) and `Some` for mutable config files (content-hash change
/// detection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub path_hash: u64,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub checksum: Option<String>,
}

impl FileFingerprint {
    pub fn append_only(path: &str, size: u64) -> Self {
        Self {
            path_hash: path_hash(path),
            size,
            checksum: None,
        }
    }

    pub fn mutable(path: &str, size: u64, checksum: String) -> Self {
        Self {
            path_hash: path_hash(path),
            size,
            checksum: Some(checksum),
        }
    }

    /// Whether `current` represents a change from `self` under this
    /// fingerprint's own change-detection policy (size-only if `checksum`
    /// is `None`, content-hash otherwise).
    pub fn differs_from(&self, current: &FileFingerprint) -> bool {
        match (&self.checksum, &current.checksum) {
            (None, _) => self.size != current.size,
            (Some(old), Some(new)) => old != new,
            (Some(_), None) => true,
        }
    }
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
