// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! uo - control and inspect the upload orchestration daemon over its HTTP
//! status surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod env;
mod output;

use clap::{Parser, Subcommand};

use crate::client::DaemonClient;
use crate::output::print_json;

#[derive(Parser)]
#[command(name = "uo", version, about = "Control and inspect the upload orchestration daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current FSM state, mode, and pending-folder counts
    Status,
    /// Print recent activity samples
    Activity,
    /// Request an immediate upload attempt
    Trigger,
    /// Monitor mode controls
    #[command(subcommand)]
    Monitor(MonitorCommand),
    /// Wipe persisted upload state on the next daemon restart
    ResetState,
}

#[derive(Subcommand)]
enum MonitorCommand {
    /// Enter monitoring mode
    Start,
    /// Leave monitoring mode
    Stop,
}

fn main() {
    let cli = Cli::parse();
    let client = DaemonClient::new();

    let result = match cli.command {
        Command::Status => client.status().map(|body| print_json(&body)),
        Command::Activity => client.activity().map(|body| print_json(&body)),
        Command::Trigger => client.trigger(),
        Command::Monitor(MonitorCommand::Start) => client.monitor_start(),
        Command::Monitor(MonitorCommand::Stop) => client.monitor_stop(),
        Command::ResetState => client.reset_state(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
