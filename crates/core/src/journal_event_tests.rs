// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn events() -> Vec<JournalEvent> {
    vec![
        JournalEvent::FolderCompleted { name: "20260101".into() },
        JournalEvent::FileUploaded { path_hash: 42, size: 1000, checksum: None },
        JournalEvent::FileUploaded { path_hash: 7, size: 500, checksum: Some("abc".into()) },
        JournalEvent::PendingSeen { name: "20260102".into(), seen_at_ms: 1000 },
        JournalEvent::RetryIncr { name: "20260103".into() },
        JournalEvent::SessionSummary { stats: SessionStats::default() },
    ]
}

#[test]
fn journal_roundtrip_preserves_every_event() {
    for event in events() {
        let json = serde_json::to_string(&event).unwrap();
        let back: JournalEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}

#[test]
fn each_event_emits_a_single_json_line() {
    for event in events() {
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains('\n'));
    }
}
