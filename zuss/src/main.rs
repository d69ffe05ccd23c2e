// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line tool for the ZD USB switch.
//!
//! Usage:
//!   zuss ports
//!   zuss --port /dev/ttyUSB0 version
//!   zuss --port /dev/ttyUSB0 set-host-port 2
//!   zuss --port /dev/ttyUSB0 set-relay-mask 0xa

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.quiet);
    cli::run(args)
}

/// Log to stderr; received switch lines are logged at `info`.
fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
