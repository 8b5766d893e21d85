// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration surface: `key = value` lines, `#` comments, optional quotes.
//!
//! Unknown keys and out-of-range values never abort parsing — they are
//! reported as [`ConfigWarning`]s and either ignored (unknown key) or
//! clamped to the nearest valid bound (out-of-range value).

use std::collections::HashMap;
use std::fmt;

/// Upload gating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Upload whenever the host has been idle long enough, any time of day.
    Smart,
    /// Upload only within the configured daily window.
    Scheduled,
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadMode::Smart => "smart",
            UploadMode::Scheduled => "scheduled",
        })
    }
}

/// One clamp-or-ignore decision made while parsing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    UnknownKey { key: String },
    Clamped { key: String, given: String, used: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnknownKey { key } => write!(f, "unknown config key '{key}', ignored"),
            ConfigWarning::Clamped { key, given, used } => {
                write!(f, "config key '{key}' value '{given}' out of range, clamped to '{used}'")
            }
        }
    }
}

/// Parsed, clamped configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub upload_mode: UploadMode,
    pub upload_start_hour: u8,
    pub upload_end_hour: u8,
    pub inactivity_seconds: u32,
    pub exclusive_access_minutes: u32,
    pub cooldown_minutes: u32,
    pub recent_folder_days: u32,
    pub max_days: u32,
    pub gmt_offset_hours: i8,
    pub enable_reset_frame: bool,
    /// Mandatory per-import file names, injected rather than hard-coded
    /// (the core accepts a configurable list).
    pub mandatory_files: Vec<String>,
    /// Raw backend activation/credential keys, opaque to this core.
    pub backend_raw: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_mode: UploadMode::Smart,
            upload_start_hour: 9,
            upload_end_hour: 21,
            inactivity_seconds: 125,
            exclusive_access_minutes: 5,
            cooldown_minutes: 10,
            recent_folder_days: 2,
            max_days: 365,
            gmt_offset_hours: 0,
            enable_reset_frame: false,
            mandatory_files: Vec::new(),
            backend_raw: HashMap::new(),
        }
    }
}

impl Config {
    pub fn inactivity_ms(&self) -> u32 {
        self.inactivity_seconds * 1000
    }

    pub fn exclusive_access_ms(&self) -> u64 {
        self.exclusive_access_minutes as u64 * 60_000
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_minutes as u64 * 60_000
    }

    /// Parse a `key = value` configuration text, clamping and warning
    /// rather than failing. Known backend keys (anything not recognized as
    /// a core key) are stashed verbatim in `backend_raw`.
    pub fn parse(text: &str) -> (Config, Vec<ConfigWarning>) {
        let mut config = Config::default();
        let mut warnings = Vec::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = unquote(value.trim());

            apply_key(&mut config, key, value, &mut warnings);
        }

        (config, warnings)
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn apply_key(config: &mut Config, key: &str, value: &str, warnings: &mut Vec<ConfigWarning>) {
    match key {
        "UPLOAD_MODE" => match value {
            "smart" => config.upload_mode = UploadMode::Smart,
            "scheduled" => config.upload_mode = UploadMode::Scheduled,
            other => warnings.push(ConfigWarning::Clamped {
                key: key.into(),
                given: other.into(),
                used: "smart".into(),
            }),
        },
        "UPLOAD_START_HOUR" => clamp_u8(config, key, value, 0, 23, warnings, |c, v| c.upload_start_hour = v),
        "UPLOAD_END_HOUR" => clamp_u8(config, key, value, 0, 23, warnings, |c, v| c.upload_end_hour = v),
        "INACTIVITY_SECONDS" => clamp_u32(config, key, value, 10, 3600, warnings, |c, v| c.inactivity_seconds = v),
        "EXCLUSIVE_ACCESS_MINUTES" => clamp_u32(config, key, value, 1, 30, warnings, |c, v| c.exclusive_access_minutes = v),
        "COOLDOWN_MINUTES" => clamp_u32(config, key, value, 1, 60, warnings, |c, v| c.cooldown_minutes = v),
        "RECENT_FOLDER_DAYS" => clamp_u32(config, key, value, 0, 30, warnings, |c, v| c.recent_folder_days = v),
        "MAX_DAYS" => clamp_u32(config, key, value, 1, 3650, warnings, |c, v| c.max_days = v),
        "GMT_OFFSET_HOURS" => clamp_i8(config, key, value, -12, 14, warnings, |c, v| c.gmt_offset_hours = v),
        "ENABLE_RESET_FRAME" => match value {
            "true" => config.enable_reset_frame = true,
            "false" => config.enable_reset_frame = false,
            other => warnings.push(ConfigWarning::Clamped {
                key: key.into(),
                given: other.into(),
                used: "false".into(),
            }),
        },
        "MANDATORY_FILES" => {
            config.mandatory_files = value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        _ if key.starts_with("BACKEND_") => {
            config.backend_raw.insert(key.to_string(), value.to_string());
        }
        _ => warnings.push(ConfigWarning::UnknownKey { key: key.into() }),
    }
}

fn clamp_u8(
    config: &mut Config,
    key: &str,
    value: &str,
    min: u8,
    max: u8,
    warnings: &mut Vec<ConfigWarning>,
    set: impl FnOnce(&mut Config, u8),
) {
    match value.parse::<i64>() {
        Ok(parsed) => {
            let clamped = parsed.clamp(min as i64, max as i64) as u8;
            if clamped as i64 != parsed {
                warnings.push(ConfigWarning::Clamped {
                    key: key.into(),
                    given: value.into(),
                    used: clamped.to_string(),
                });
            }
            set(config, clamped);
        }
        Err(_) => warnings.push(ConfigWarning::Clamped {
            key: key.into(),
            given: value.into(),
            used: min.to_string(),
        }),
    }
}

fn clamp_u32(
    config: &mut Config,
    key: &str,
    value: &str,
    min: u32,
    max: u32,
    warnings: &mut Vec<ConfigWarning>,
    set: impl FnOnce(&mut Config, u32),
) {
    match value.parse::<i64>() {
        Ok(parsed) => {
            let clamped = parsed.clamp(min as i64, max as i64) as u32;
            if clamped as i64 != parsed {
                warnings.push(ConfigWarning::Clamped {
                    key: key.into(),
                    given: value.into(),
                    used: clamped.to_string(),
                });
            }
            set(config, clamped);
        }
        Err(_) => warnings.push(ConfigWarning::Clamped {
            key: key.into(),
            given: value.into(),
            used: min.to_string(),
        }),
    }
}

fn clamp_i8(
    config: &mut Config,
    key: &str,
    value: &str,
    min: i8,
    max: i8,
    warnings: &mut Vec<ConfigWarning>,
    set: impl FnOnce(&mut Config, i8),
) {
    match value.parse::<i64>() {
        Ok(parsed) => {
            let clamped = parsed.clamp(min as i64, max as i64) as i8;
            if clamped as i64 != parsed {
                warnings.push(ConfigWarning::Clamped {
                    key: key.into(),
                    given: value.into(),
                    used: clamped.to_string(),
                });
            }
            set(config, clamped);
        }
        Err(_) => warnings.push(ConfigWarning::Clamped {
            key: key.into(),
            given: value.into(),
            used: min.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
