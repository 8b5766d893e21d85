// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! uod: the upload orchestration daemon. Wires the board support shims,
//! configuration, and logging together, then drives the Supervisor's main
//! loop behind a small HTTP status surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod logging;

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use fs2::FileExt;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use uo_adapters::{ActivitySensor, BackendAdapter, BusArbiter, CloudAdapter, HardwareActivitySensor, ShareAdapter};
use uo_core::{BootReason, BootReasonKind, Clock, Config, SystemClock};
use uo_daemon::{board, boot, env, http, Supervisor};
use uo_engine::readonly_fs::ReadOnlyFs;
use uo_engine::{SourceMedium, UploadPipeline};
use uo_storage::StateStore;

use uo_daemon::StatusHandle;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("uod {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: uod [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let state_dir = env::state_dir();
    std::fs::create_dir_all(&state_dir)?;

    let lock_path = state_dir.join("uod.pid");
    let lock_file = match acquire_single_instance_lock(&lock_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("uod is already running: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = setup_logging(&state_dir)?;
    info!("starting upload orchestration daemon");

    if let Some(reason) = boot::read(&state_dir)? {
        handle_boot_reason(&state_dir, &reason)?;
        boot::clear(&state_dir)?;
    }

    let config_text = std::fs::read_to_string(env::config_path()).unwrap_or_default();
    let (config, warnings) = Config::parse(&config_text);
    for warning in &warnings {
        warn!(%warning, "configuration warning");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sensor: Arc<dyn ActivitySensor> = Arc::new(HardwareActivitySensor::new(Arc::clone(&clock), board::null_edge_counter()));
    let bus = Arc::new(BusArbiter::new(board::NullBusLines, Arc::clone(&clock), config.enable_reset_frame));

    let medium_root = env::medium_root();
    let fs = ReadOnlyFs::new(board::DirectoryMountOps::new(medium_root.clone()));
    let medium: Arc<dyn SourceMedium> = Arc::new(board::DirectorySourceMedium::new(medium_root, config.mandatory_files.clone()));
    let pipeline = UploadPipeline::new(medium, Arc::clone(&bus), build_backends(&config));

    let store = StateStore::open(&state_dir)?;
    let status = StatusHandle::new();
    let watchdog_fatal_secs = env::watchdog_fatal_secs();

    let supervisor =
        Supervisor::new(config, state_dir.clone(), clock, sensor, bus, fs, pipeline, store, status, watchdog_fatal_secs);

    let app = http::router(Arc::clone(&supervisor));
    let addr = env::http_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "http status surface listening");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = Arc::clone(&supervisor).run() => {
            if let Err(e) = result {
                error!(error = %e, "supervisor loop exited");
            }
        }
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!(error = %e, "http server exited");
            }
        }
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    release_single_instance_lock(&lock_path, lock_file);
    info!("daemon stopped");
    Ok(())
}

fn print_help() {
    println!("uod {}", env!("CARGO_PKG_VERSION"));
    println!("Upload orchestration daemon - shares the SD bus with the host appliance");
    println!("and uploads therapy data to the configured backends.");
    println!();
    println!("USAGE:");
    println!("    uod");
    println!();
    println!("The daemon is typically started by the init system and controlled");
    println!("through the `uo` CLI or its HTTP status surface, not invoked directly.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

/// Build the configured backend adapters from `config.backend_raw`. Both
/// keys are optional; a device with neither configured runs with an empty
/// backend list and every session completes with nothing to do.
fn build_backends(config: &Config) -> Vec<Box<dyn BackendAdapter>> {
    let mut backends: Vec<Box<dyn BackendAdapter>> = Vec::new();

    if let Some(root) = config.backend_raw.get("BACKEND_SHARE_ROOT") {
        backends.push(Box::new(ShareAdapter::new(root.clone())));
    }

    if let Some(raw_url) = config.backend_raw.get("BACKEND_CLOUD_URL") {
        match reqwest::Url::parse(raw_url) {
            Ok(url) => backends.push(Box::new(CloudAdapter::new(url))),
            Err(e) => warn!(error = %e, "invalid BACKEND_CLOUD_URL, cloud backend disabled"),
        }
    }

    if backends.is_empty() {
        warn!("no backends configured, upload sessions will have nothing to upload to");
    }

    backends
}

/// React to a boot reason left by the previous run. `StateResetRequested`
/// wipes the persisted journal/snapshot before `StateStore::open` loads
/// them; the others are diagnostic only.
fn handle_boot_reason(state_dir: &Path, reason: &BootReason) -> std::io::Result<()> {
    match reason.reason {
        BootReasonKind::StateResetRequested => {
            info!("state reset requested on previous shutdown, wiping persisted state");
            for name in ["state.snapshot", "state.journal", "summary.current"] {
                match std::fs::remove_file(state_dir.join(name)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        BootReasonKind::WatchdogKill => {
            warn!("previous run exited due to a stale software heartbeat");
        }
        BootReasonKind::StorageFatal => {
            warn!("previous run exited due to a fatal storage error");
        }
        BootReasonKind::Clean => {}
    }
    Ok(())
}

fn acquire_single_instance_lock(path: &Path) -> std::io::Result<std::fs::File> {
    let file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
    file.try_lock_exclusive()?;
    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

fn release_single_instance_lock(path: &Path, file: std::fs::File) {
    let _ = file.unlock();
    drop(file);
    let _ = std::fs::remove_file(path);
}

fn setup_logging(state_dir: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let writer = logging::AlternatingBoundedLog::open(state_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
