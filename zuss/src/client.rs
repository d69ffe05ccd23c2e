// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command/response client for the USB switch.
//!
//! Every operation writes one frame and then polls the link for reply lines
//! until a matching token shows up or the command's reply deadline passes:
//!
//! ```text
//! Idle -> Opened -> Sent -> Awaiting-Reply -> {Matched | TimedOut} -> Closed
//! ```
//!
//! [`UsbSwitch`] opens and closes the port around each call. [`Session`]
//! keeps one port open across several calls and closes it when dropped.

use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};
use zuss_common::protocol::{Command, Control, Mask, PortId};
use zuss_common::reply::{self, PortState, ReplyError, Version};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::transport::{Connector, Link, SerialConnector};

/// Log target for every line received from the switch.
pub const RX_TARGET: &str = "zuss::rx";

/// One open connection to the switch.
///
/// Operations take `&mut self`, so a new command is never written before
/// the previous one has matched or timed out.
pub struct Session<L: Link> {
    link: L,
    config: SessionConfig,
}

impl<L: Link> Session<L> {
    pub fn new(link: L, config: SessionConfig) -> Self {
        Self { link, config }
    }

    /// Query the firmware version, e.g. `v1.2.0`.
    pub fn get_version(&mut self) -> Result<Option<Version>> {
        self.transact(&Command::GetVersion, reply::parse_version)
    }

    /// Reboot the switch. Waits up to 10 s for the acknowledgment.
    pub fn reboot(&mut self) -> Result<bool> {
        self.execute(&Command::Reboot)
    }

    /// Persist the current configuration to flash.
    pub fn save_config(&mut self) -> Result<bool> {
        self.execute(&Command::SaveConfig)
    }

    /// Reset the stored configuration to its initial state.
    pub fn clear_config(&mut self) -> Result<bool> {
        self.execute(&Command::ClearConfig)
    }

    /// Make the switch print its RAM configuration. The printed lines show up
    /// in the receive log.
    pub fn display_config(&mut self) -> Result<bool> {
        self.execute(&Command::DisplayConfig)
    }

    pub fn set_host_port(&mut self, port: PortId) -> Result<bool> {
        self.execute(&Command::SetHostPort(port))
    }

    pub fn get_host_port(&mut self) -> Result<Option<PortId>> {
        let cmd = Command::GetHostPort;
        self.transact(&cmd, |line| reply::parse_port(line, cmd.name()))
    }

    pub fn set_device_port(&mut self, port: PortId) -> Result<bool> {
        self.execute(&Command::SetDevicePort(port))
    }

    pub fn get_device_port(&mut self) -> Result<Option<PortId>> {
        let cmd = Command::GetDevicePort;
        self.transact(&cmd, |line| reply::parse_port(line, cmd.name()))
    }

    /// Set all four relays at once. Bit k controls relay k+1.
    pub fn set_relay_mask(&mut self, mask: Mask) -> Result<bool> {
        self.execute(&Command::SetRelayMask(mask))
    }

    pub fn get_relay_mask(&mut self) -> Result<Option<Mask>> {
        let cmd = Command::GetRelayMask;
        self.transact(&cmd, |line| reply::parse_mask(line, cmd.name()))
    }

    /// Choose which device ports supply power. Bit k controls port k+1.
    pub fn set_power_mask(&mut self, mask: Mask) -> Result<bool> {
        self.execute(&Command::SetPowerMask(mask))
    }

    pub fn get_power_mask(&mut self) -> Result<Option<Mask>> {
        let cmd = Command::GetPowerMask;
        self.transact(&cmd, |line| reply::parse_mask(line, cmd.name()))
    }

    pub fn set_relay(&mut self, relay: PortId, control: Control) -> Result<bool> {
        self.execute(&Command::SetRelay { relay, control })
    }

    pub fn get_relay(&mut self, relay: PortId) -> Result<Option<PortState>> {
        let cmd = Command::GetRelay { relay };
        self.transact(&cmd, |line| parse_state_for(line, &cmd, relay))
    }

    pub fn set_power(&mut self, device: PortId, control: Control) -> Result<bool> {
        self.execute(&Command::SetPower { device, control })
    }

    pub fn get_power(&mut self, device: PortId) -> Result<Option<PortState>> {
        let cmd = Command::GetPower { device };
        self.transact(&cmd, |line| parse_state_for(line, &cmd, device))
    }

    /// Close the port now instead of at drop.
    pub fn close(self) {
        drop(self);
    }

    /// Send a command whose only result is its acknowledgment.
    fn execute(&mut self, cmd: &Command) -> Result<bool> {
        let acked = self.transact(cmd, |line| {
            reply::is_ack(line, cmd).then_some(Ok::<(), ReplyError>(()))
        })?;
        Ok(acked.is_some())
    }

    /// Write `cmd` and poll for a line accepted by `matcher`.
    ///
    /// Input left over from an earlier command is dropped before writing.
    /// `Ok(None)` means the deadline passed without a matching line.
    fn transact<T, F>(&mut self, cmd: &Command, matcher: F) -> Result<Option<T>>
    where
        F: Fn(&str) -> Option<std::result::Result<T, ReplyError>>,
    {
        if !self.link.is_open() {
            return Err(Error::Write(format!("cannot send {}: link is closed", cmd.name())));
        }

        let stale = self.link.clear_input()?;
        if stale > 0 {
            debug!(command = cmd.name(), bytes = stale, "discarded unread input");
        }

        let frame = cmd.encode();
        let deadline = self.config.deadline_for(cmd);
        debug!(frame = %frame, ?deadline, "sending command");
        self.link.write(frame.as_bytes())?;

        let start = Instant::now();
        while start.elapsed() <= deadline {
            if self.link.bytes_pending()? == 0 {
                thread::sleep(self.config.poll_interval);
                continue;
            }
            let Some(raw) = self.link.read_line()? else {
                continue;
            };
            let Some(line) = decode_line(&raw) else {
                warn!(bytes = ?raw, "skipping line that is not ASCII");
                continue;
            };
            info!(target: RX_TARGET, "{}", line);

            match matcher(line) {
                None => continue,
                Some(Ok(value)) => {
                    debug!(command = cmd.name(), elapsed = ?start.elapsed(), "reply matched");
                    return Ok(Some(value));
                }
                Some(Err(reason)) => {
                    return Err(Error::MalformedReply {
                        command: cmd.name(),
                        line: line.to_string(),
                        reason,
                    })
                }
            }
        }

        warn!(command = cmd.name(), ?deadline, "no reply before deadline");
        Ok(None)
    }
}

impl<L: Link> Drop for Session<L> {
    fn drop(&mut self) {
        self.link.close();
    }
}

/// Accept a `[NAME{p,c}]` reply only when `p` is the port that was asked for.
fn parse_state_for(
    line: &str,
    cmd: &Command,
    port: PortId,
) -> Option<std::result::Result<PortState, ReplyError>> {
    match reply::parse_pair(line, cmd.name()) {
        Some(Ok(state)) if state.port != port => {
            debug!(command = cmd.name(), reported = %state.port, "reply for another port");
            None
        }
        other => other,
    }
}

/// Strip the line terminator; `None` for lines with non-ASCII bytes.
fn decode_line(raw: &[u8]) -> Option<&str> {
    if !raw.is_ascii() {
        return None;
    }
    std::str::from_utf8(raw)
        .ok()
        .map(|line| line.trim_end_matches(['\r', '\n']))
}

/// Per-call client: every operation opens the port, runs one command and
/// closes the port again.
///
/// Arguments are plain integers as printed on the switch; they are checked
/// before the port is opened and rejected with [`Error::InvalidParameter`].
pub struct UsbSwitch<C: Connector = SerialConnector> {
    connector: C,
}

impl UsbSwitch<SerialConnector> {
    /// Client for the switch on `port` with default line settings.
    pub fn new(port: impl Into<String>) -> Self {
        Self::from_connector(SerialConnector::new(port))
    }

    pub fn with_config(port: impl Into<String>, config: SessionConfig) -> Self {
        Self::from_connector(SerialConnector::with_config(port, config))
    }
}

impl<C: Connector> UsbSwitch<C> {
    pub fn from_connector(connector: C) -> Self {
        Self { connector }
    }

    pub fn port_name(&self) -> &str {
        self.connector.port_name()
    }

    /// Open the port and keep it open until the session is dropped.
    pub fn session(&self) -> Result<Session<C::Link>> {
        let link = self.connector.open()?;
        Ok(Session::new(link, self.connector.config().clone()))
    }

    pub fn get_version(&self) -> Result<Option<Version>> {
        self.session()?.get_version()
    }

    pub fn reboot(&self) -> Result<bool> {
        self.session()?.reboot()
    }

    pub fn save_config(&self) -> Result<bool> {
        self.session()?.save_config()
    }

    pub fn clear_config(&self) -> Result<bool> {
        self.session()?.clear_config()
    }

    pub fn display_config(&self) -> Result<bool> {
        self.session()?.display_config()
    }

    /// Select the active host port (1-4).
    pub fn set_host_port(&self, port: u8) -> Result<bool> {
        let port = port_id(port)?;
        self.session()?.set_host_port(port)
    }

    pub fn get_host_port(&self) -> Result<Option<PortId>> {
        self.session()?.get_host_port()
    }

    /// Select the active device port (1-4).
    pub fn set_device_port(&self, port: u8) -> Result<bool> {
        let port = port_id(port)?;
        self.session()?.set_device_port(port)
    }

    pub fn get_device_port(&self) -> Result<Option<PortId>> {
        self.session()?.get_device_port()
    }

    /// Set the relay mask (0x0-0xf).
    pub fn set_relay_mask(&self, bits: u8) -> Result<bool> {
        let mask = mask(bits)?;
        self.session()?.set_relay_mask(mask)
    }

    pub fn get_relay_mask(&self) -> Result<Option<Mask>> {
        self.session()?.get_relay_mask()
    }

    /// Set the power supply mask (0x0-0xf).
    pub fn set_power_mask(&self, bits: u8) -> Result<bool> {
        let mask = mask(bits)?;
        self.session()?.set_power_mask(mask)
    }

    pub fn get_power_mask(&self) -> Result<Option<Mask>> {
        self.session()?.get_power_mask()
    }

    /// Open (0) or close (1) one relay.
    pub fn set_relay(&self, relay: u8, control: u8) -> Result<bool> {
        let relay = port_id(relay)?;
        let control = control_value(control)?;
        self.session()?.set_relay(relay, control)
    }

    pub fn get_relay(&self, relay: u8) -> Result<Option<PortState>> {
        let relay = port_id(relay)?;
        self.session()?.get_relay(relay)
    }

    /// Power a device port off (0) or on (1).
    pub fn set_power(&self, device: u8, control: u8) -> Result<bool> {
        let device = port_id(device)?;
        let control = control_value(control)?;
        self.session()?.set_power(device, control)
    }

    pub fn get_power(&self, device: u8) -> Result<Option<PortState>> {
        let device = port_id(device)?;
        self.session()?.get_power(device)
    }
}

fn port_id(id: u8) -> Result<PortId> {
    PortId::new(id)
        .ok_or_else(|| Error::InvalidParameter(format!("port {} is not between 1 and 4", id)))
}

fn mask(bits: u8) -> Result<Mask> {
    Mask::new(bits)
        .ok_or_else(|| Error::InvalidParameter(format!("mask {:#x} is larger than 0xf", bits)))
}

fn control_value(value: u8) -> Result<Control> {
    Control::from_digit(value)
        .ok_or_else(|| Error::InvalidParameter(format!("control {} is not 0 or 1", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminator() {
        assert_eq!(decode_line(b"[SAVE_CONFIG{ok}]\r\n"), Some("[SAVE_CONFIG{ok}]"));
        assert_eq!(decode_line(b"partial"), Some("partial"));
    }

    #[test]
    fn test_decode_line_rejects_non_ascii() {
        assert_eq!(decode_line(&[0x5B, 0xFF, 0x5D, b'\n']), None);
        assert_eq!(decode_line("caf\u{e9}\n".as_bytes()), None);
    }

    #[test]
    fn test_argument_checks() {
        assert!(port_id(1).is_ok());
        assert!(matches!(port_id(0), Err(Error::InvalidParameter(_))));
        assert!(matches!(mask(0x10), Err(Error::InvalidParameter(_))));
        assert!(matches!(control_value(2), Err(Error::InvalidParameter(_))));
        assert_eq!(control_value(1).unwrap(), Control::On);
    }

    #[test]
    fn test_pair_reply_for_other_port_is_skipped() {
        let relay2 = PortId::new(2).unwrap();
        let cmd = Command::GetRelay { relay: relay2 };
        assert_eq!(parse_state_for("[GET_RELAY{1,1}]", &cmd, relay2), None);
        assert_eq!(
            parse_state_for("[GET_RELAY{2,0}]", &cmd, relay2),
            Some(Ok(PortState {
                port: relay2,
                control: Control::Off
            }))
        );
        assert_eq!(
            parse_state_for("[GET_RELAY{2}]", &cmd, relay2),
            Some(Err(ReplyError::InvalidPair))
        );
    }

    #[cfg(unix)]
    mod pty {
        use std::io::{Read, Write};
        use std::thread::{self, JoinHandle};
        use std::time::Duration;

        use serialport::{SerialPort, TTYPort};

        use super::*;
        use crate::transport::SerialLink;

        fn pty_session() -> (Session<SerialLink>, TTYPort) {
            let (mut master, mut slave) = TTYPort::pair().unwrap();
            slave.set_timeout(Duration::from_millis(20)).unwrap();
            master.set_timeout(Duration::from_secs(1)).unwrap();
            let config = SessionConfig::default()
                .with_deadline(Duration::from_millis(200))
                .with_poll_interval(Duration::from_millis(1));
            let link = SerialLink::from_port("pty", Box::new(slave));
            (Session::new(link, config), master)
        }

        /// Wait for one frame from the host, then write `reply`.
        fn answer(mut device: TTYPort, reply: &'static [u8]) -> JoinHandle<(TTYPort, String)> {
            thread::spawn(move || {
                let mut frame = Vec::new();
                let mut byte = [0u8; 1];
                while !frame.ends_with(b">") {
                    device.read_exact(&mut byte).unwrap();
                    frame.push(byte[0]);
                }
                device.write_all(reply).unwrap();
                (device, String::from_utf8(frame).unwrap())
            })
        }

        fn deliver_late(device: &mut TTYPort, line: &[u8]) {
            device.write_all(line).unwrap();
            thread::sleep(Duration::from_millis(20));
        }

        #[test]
        fn test_session_reply_over_serial_link() {
            let (mut session, device) = pty_session();
            let device = answer(device, b"junk\r\n\xff\xfe\nReturn: [GET_HOST_PORT{3}]\r\n");

            assert_eq!(session.get_host_port().unwrap(), PortId::new(3));
            let (_device, frame) = device.join().unwrap();
            assert_eq!(frame, "<GET_HOST_PORT{}>");
        }

        #[test]
        fn test_late_reply_is_not_taken_by_next_command() {
            let (mut session, mut device) = pty_session();
            deliver_late(&mut device, b"[GET_HOST_PORT{1}]\r\n");
            let device = answer(device, b"[GET_HOST_PORT{4}]\r\n");

            assert_eq!(session.get_host_port().unwrap(), PortId::new(4));
            device.join().unwrap();
        }

        #[test]
        fn test_late_relay_reply_after_timeout() {
            let (mut session, mut device) = pty_session();
            let relay1 = PortId::new(1).unwrap();
            let relay2 = PortId::new(2).unwrap();

            // Nobody answers the first query; its reply shows up afterwards.
            assert_eq!(session.get_relay(relay1).unwrap(), None);
            deliver_late(&mut device, b"[GET_RELAY{1,1}]\r\n");

            assert_eq!(session.get_relay(relay2).unwrap(), None);
        }
    }
}
