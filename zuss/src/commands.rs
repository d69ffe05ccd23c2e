// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for switch operations.

use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;

use zuss::client::RX_TARGET;
use zuss::{list_ports, Mask, PortState, UsbSwitch};

/// List available serial ports.
pub fn ports() -> Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

/// Get and display the firmware version.
pub fn version(switch: &UsbSwitch) -> Result<()> {
    match switch.get_version()? {
        Some(version) => println!("Firmware version: {}", version),
        None => bail!("No version reply from {}", switch.port_name()),
    }
    Ok(())
}

/// Reboot the switch and wait for the acknowledgment.
pub fn reboot(switch: &UsbSwitch) -> Result<()> {
    let spinner = reboot_spinner(switch.port_name())?;
    let result = switch.reboot();
    spinner.finish_and_clear();

    expect_ack(result?, "REBOOT_SYS")?;
    println!("Switch rebooted.");
    Ok(())
}

/// Save the configuration to flash.
pub fn save_config(switch: &UsbSwitch) -> Result<()> {
    expect_ack(switch.save_config()?, "SAVE_CONFIG")?;
    println!("Configuration saved.");
    Ok(())
}

/// Reset the stored configuration.
pub fn clear_config(switch: &UsbSwitch) -> Result<()> {
    expect_ack(switch.clear_config()?, "CLEAR_CONFIG")?;
    println!("Configuration cleared.");
    println!(
        "Use 'zuss --port {} reboot' to apply the initial configuration.",
        switch.port_name()
    );
    Ok(())
}

/// Ask the switch to print its RAM configuration (shown in the log output).
pub fn display_config(switch: &UsbSwitch) -> Result<()> {
    expect_ack(switch.display_config()?, "DISP_CONFIG")?;
    Ok(())
}

pub fn set_host_port(switch: &UsbSwitch, port: u8) -> Result<()> {
    expect_ack(switch.set_host_port(port)?, "SET_HOST_PORT")?;
    println!("Host port set to {}.", port);
    Ok(())
}

pub fn get_host_port(switch: &UsbSwitch) -> Result<()> {
    match switch.get_host_port()? {
        Some(port) => println!("Host port: {}", port),
        None => bail!("No host port reply from {}", switch.port_name()),
    }
    Ok(())
}

pub fn set_device_port(switch: &UsbSwitch, port: u8) -> Result<()> {
    expect_ack(switch.set_device_port(port)?, "SET_DEVICE_PORT")?;
    println!("Device port set to {}.", port);
    Ok(())
}

pub fn get_device_port(switch: &UsbSwitch) -> Result<()> {
    match switch.get_device_port()? {
        Some(port) => println!("Device port: {}", port),
        None => bail!("No device port reply from {}", switch.port_name()),
    }
    Ok(())
}

pub fn set_relay_mask(switch: &UsbSwitch, mask: u8) -> Result<()> {
    expect_ack(switch.set_relay_mask(mask)?, "SET_RELAY_MASK")?;
    println!("Relay mask set to {:#x}.", mask);
    Ok(())
}

pub fn get_relay_mask(switch: &UsbSwitch) -> Result<()> {
    match switch.get_relay_mask()? {
        Some(mask) => print_mask("Relay mask", "Relay", mask, ("closed", "open")),
        None => bail!("No relay mask reply from {}", switch.port_name()),
    }
    Ok(())
}

pub fn set_power_mask(switch: &UsbSwitch, mask: u8) -> Result<()> {
    expect_ack(switch.set_power_mask(mask)?, "SET_POWER_MASK")?;
    println!("Power mask set to {:#x}.", mask);
    Ok(())
}

pub fn get_power_mask(switch: &UsbSwitch) -> Result<()> {
    match switch.get_power_mask()? {
        Some(mask) => print_mask("Power mask", "Device port", mask, ("on", "off")),
        None => bail!("No power mask reply from {}", switch.port_name()),
    }
    Ok(())
}

pub fn set_relay(switch: &UsbSwitch, relay: u8, control: u8) -> Result<()> {
    expect_ack(switch.set_relay(relay, control)?, "SET_RELAY")?;
    println!(
        "Relay {} {}.",
        relay,
        if control == 1 { "closed" } else { "opened" }
    );
    Ok(())
}

pub fn get_relay(switch: &UsbSwitch, relay: u8) -> Result<()> {
    match switch.get_relay(relay)? {
        Some(state) => print_state("Relay", state, ("closed", "open")),
        None => bail!("No relay {} reply from {}", relay, switch.port_name()),
    }
    Ok(())
}

pub fn set_power(switch: &UsbSwitch, device: u8, control: u8) -> Result<()> {
    expect_ack(switch.set_power(device, control)?, "SET_POWER")?;
    println!(
        "Device port {} power {}.",
        device,
        if control == 1 { "on" } else { "off" }
    );
    Ok(())
}

pub fn get_power(switch: &UsbSwitch, device: u8) -> Result<()> {
    match switch.get_power(device)? {
        Some(state) => print_state("Device port", state, ("on", "off")),
        None => bail!(
            "No power reply for device port {} from {}",
            device,
            switch.port_name()
        ),
    }
    Ok(())
}

/// The received-line log and the spinner both draw on stderr, so the
/// spinner only runs when that log is filtered out (`--quiet`).
fn reboot_spinner(port: &str) -> Result<ProgressBar> {
    let message = format!("Rebooting switch on {}...", port);
    if tracing::enabled!(target: RX_TARGET, Level::INFO) {
        println!("{}", message);
        return Ok(ProgressBar::hidden());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?,
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn expect_ack(acked: bool, command: &str) -> Result<()> {
    if !acked {
        bail!("Switch did not acknowledge {} before the deadline", command);
    }
    Ok(())
}

fn print_mask(title: &str, label: &str, mask: Mask, (on, off): (&str, &str)) {
    println!("{}: {} ({:04b})", title, mask, mask.bits());
    for (port, control) in mask.states() {
        println!(
            "  {} {}: {}",
            label,
            port,
            if control.is_on() { on } else { off }
        );
    }
}

fn print_state(label: &str, state: PortState, (on, off): (&str, &str)) {
    println!(
        "{} {}: {} ({})",
        label,
        state.port,
        if state.control.is_on() { on } else { off },
        state.control
    );
}
