// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use zuss::{SessionConfig, UsbSwitch};
use zuss_common::protocol::{BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "zuss")]
#[command(about = "Command-line control for the ZD USB switch")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyUSB0 or COM3)
    #[arg(short, long, env = "ZUSS_PORT", global = true)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(long, default_value_t = BAUD_RATE, global = true)]
    pub baud: u32,

    /// Serial read timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_MS, global = true)]
    pub timeout_ms: u64,

    /// Reply deadline in milliseconds for every command (default: per command)
    #[arg(long, global = true)]
    pub deadline_ms: Option<u64>,

    /// Only log warnings and errors (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// List available serial ports
    Ports,

    /// Get the firmware version
    Version,

    /// Reboot the switch
    Reboot,

    /// Save the current configuration to flash
    SaveConfig,

    /// Reset the stored configuration to its initial state
    ClearConfig,

    /// Print the configuration held in RAM
    DispConfig,

    /// Select the active host port
    SetHostPort {
        /// Host port (1-4)
        #[arg(value_name = "PORT", value_parser = clap::value_parser!(u8).range(1..=4))]
        number: u8,
    },

    /// Get the active host port
    GetHostPort,

    /// Select the active device port
    SetDevicePort {
        /// Device port (1-4)
        #[arg(value_name = "PORT", value_parser = clap::value_parser!(u8).range(1..=4))]
        number: u8,
    },

    /// Get the active device port
    GetDevicePort,

    /// Set all relays at once (bit 0 = relay 1)
    SetRelayMask {
        /// Mask, hex (0xa) or decimal (10), 0x0-0xf
        #[arg(value_name = "MASK", value_parser = parse_mask)]
        mask: u8,
    },

    /// Get the relay mask
    GetRelayMask,

    /// Choose which device ports supply power (bit 0 = port 1)
    SetPowerMask {
        /// Mask, hex (0xa) or decimal (10), 0x0-0xf
        #[arg(value_name = "MASK", value_parser = parse_mask)]
        mask: u8,
    },

    /// Get the power supply mask
    GetPowerMask,

    /// Open (0) or close (1) one relay
    SetRelay {
        /// Relay (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        relay: u8,
        /// 0 = open, 1 = closed
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        control: u8,
    },

    /// Get the state of one relay
    GetRelay {
        /// Relay (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        relay: u8,
    },

    /// Power one device port off (0) or on (1)
    SetPower {
        /// Device port (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        device: u8,
        /// 0 = off, 1 = on
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        control: u8,
    },

    /// Get the power state of one device port
    GetPower {
        /// Device port (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        device: u8,
    },
}

/// Parse a mask given as `0xH` or as a decimal number.
fn parse_mask(s: &str) -> Result<u8, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    }
    .map_err(|e| format!("invalid mask '{}': {}", s, e))?;

    if value > 0xF {
        return Err(format!("mask {:#x} is larger than 0xf", value));
    }
    Ok(value)
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::default()
            .with_baud_rate(self.baud)
            .with_read_timeout(Duration::from_millis(self.timeout_ms));
        match self.deadline_ms {
            Some(ms) => config.with_deadline(Duration::from_millis(ms)),
            None => config,
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Ports = cli.command {
        return commands::ports();
    }

    let config = cli.session_config();
    let port = cli
        .port
        .context("No serial port given (use --port or ZUSS_PORT, see 'zuss ports')")?;
    let switch = UsbSwitch::with_config(port, config);

    match cli.command {
        Commands::Ports => commands::ports(),
        Commands::Version => commands::version(&switch),
        Commands::Reboot => commands::reboot(&switch),
        Commands::SaveConfig => commands::save_config(&switch),
        Commands::ClearConfig => commands::clear_config(&switch),
        Commands::DispConfig => commands::display_config(&switch),
        Commands::SetHostPort { number } => commands::set_host_port(&switch, number),
        Commands::GetHostPort => commands::get_host_port(&switch),
        Commands::SetDevicePort { number } => commands::set_device_port(&switch, number),
        Commands::GetDevicePort => commands::get_device_port(&switch),
        Commands::SetRelayMask { mask } => commands::set_relay_mask(&switch, mask),
        Commands::GetRelayMask => commands::get_relay_mask(&switch),
        Commands::SetPowerMask { mask } => commands::set_power_mask(&switch, mask),
        Commands::GetPowerMask => commands::get_power_mask(&switch),
        Commands::SetRelay { relay, control } => commands::set_relay(&switch, relay, control),
        Commands::GetRelay { relay } => commands::get_relay(&switch, relay),
        Commands::SetPower { device, control } => commands::set_power(&switch, device, control),
        Commands::GetPower { device } => commands::get_power(&switch, device),
    }
}
