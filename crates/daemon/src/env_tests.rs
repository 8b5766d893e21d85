// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::path::PathBuf;

fn clear_vars() {
    for key in ["UO_STATE_DIR", "XDG_STATE_HOME", "UO_MEDIUM_ROOT", "UO_CONFIG_PATH", "UO_HTTP_ADDR", "UO_WATCHDOG_FATAL_SECS"] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn state_dir_prefers_uo_state_dir_override() {
    clear_vars();
    std::env::set_var("UO_STATE_DIR", "/tmp/uo-example-state");
    assert_eq!(state_dir(), PathBuf::from("/tmp/uo-example-state"));
    clear_vars();
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg_state_home() {
    clear_vars();
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg-state");
    assert_eq!(state_dir(), PathBuf::from("/tmp/xdg-state/uo"));
    clear_vars();
}

#[test]
#[serial]
fn config_path_defaults_under_state_dir() {
    clear_vars();
    std::env::set_var("UO_STATE_DIR", "/tmp/uo-example-state");
    assert_eq!(config_path(), PathBuf::from("/tmp/uo-example-state/config.txt"));
    clear_vars();
}

#[test]
#[serial]
fn config_path_override_takes_precedence() {
    clear_vars();
    std::env::set_var("UO_CONFIG_PATH", "/tmp/custom-config.txt");
    assert_eq!(config_path(), PathBuf::from("/tmp/custom-config.txt"));
    clear_vars();
}

#[test]
#[serial]
fn http_addr_has_a_default() {
    clear_vars();
    assert_eq!(http_addr(), "127.0.0.1:8787");
}

#[test]
#[serial]
fn http_addr_honors_override() {
    clear_vars();
    std::env::set_var("UO_HTTP_ADDR", "0.0.0.0:9000");
    assert_eq!(http_addr(), "0.0.0.0:9000");
    clear_vars();
}

#[test]
#[serial]
fn watchdog_fatal_secs_defaults_to_120() {
    clear_vars();
    assert_eq!(watchdog_fatal_secs(), 120);
}

#[test]
#[serial]
fn watchdog_fatal_secs_ignores_unparseable_override() {
    clear_vars();
    std::env::set_var("UO_WATCHDOG_FATAL_SECS", "not-a-number");
    assert_eq!(watchdog_fatal_secs(), 120);
    clear_vars();
}

#[test]
#[serial]
fn watchdog_fatal_secs_honors_override() {
    clear_vars();
    std::env::set_var("UO_WATCHDOG_FATAL_SECS", "30");
    assert_eq!(watchdog_fatal_secs(), 30);
    clear_vars();
}
