// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Reply lines for switch -> host communication.
//!
//! The switch answers each command with a line containing a bracketed token,
//! e.g. `[GET_RELAY{2,1}]`. Depending on firmware the token may be preceded
//! by text such as `Return: `, so host-side matching searches for the token
//! anywhere in the line.
//!
//! The `parse_*` functions return `None` when the line does not carry the
//! reply at all, and `Some(Err(..))` when the reply prefix is present but the
//! payload cannot be decoded.

use core::fmt::Write;

use heapless::String;

use crate::protocol::{Command, Control, Mask, PortId};

/// Capacity of a firmware version string.
pub const VERSION_CAPACITY: usize = 24;

/// Capacity of a reply line produced by [`Reply::encode`].
pub const LINE_CAPACITY: usize = 64;

pub const REPLY_START: char = '[';
pub const REPLY_END: char = ']';

/// Firmware version token, e.g. `v1.2.0`.
pub type Version = String<VERSION_CAPACITY>;

/// An encoded reply line, without line terminator.
pub type Line = String<LINE_CAPACITY>;

/// Errors when a reply prefix is present but its payload is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("reply payload is empty")]
    Empty,
    #[error("reply payload is not terminated by '}}'")]
    Unterminated,
    #[error("port id is not a digit between 1 and 4")]
    InvalidPort,
    #[error("control value is not 0 or 1")]
    InvalidControl,
    #[error("mask is not a hexadecimal literal")]
    InvalidHex,
    #[error("mask is larger than 0xf")]
    MaskOutOfRange,
    #[error("expected two comma-separated integers")]
    InvalidPair,
    #[error("version string is too long")]
    VersionTooLong,
}

/// A relay or device port together with its control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortState {
    pub port: PortId,
    pub control: Control,
}

// --- Host side: matching and parsing ---

/// Check whether `line` acknowledges `cmd`. Always false for queries.
pub fn is_ack(line: &str, cmd: &Command) -> bool {
    cmd.ack_token()
        .map(|token| line.contains(token.as_str()))
        .unwrap_or(false)
}

/// Return everything after the first `[NAME{` in `line`.
pub fn payload<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.match_indices(name).find_map(|(idx, _)| {
        let before = line[..idx].chars().next_back();
        let after = &line[idx + name.len()..];
        match (before, after.strip_prefix('{')) {
            (Some(REPLY_START), Some(rest)) => Some(rest),
            _ => None,
        }
    })
}

/// Payload up to (not including) the closing brace.
fn body(payload: &str) -> Result<&str, ReplyError> {
    payload
        .split_once('}')
        .map(|(body, _)| body)
        .ok_or(ReplyError::Unterminated)
}

/// Parse `[GET_SW_VERSION{v1.2.0 build 42}]` into `v1.2.0`.
pub fn parse_version(line: &str) -> Option<Result<Version, ReplyError>> {
    let rest = payload(line, Command::GetVersion.name())?;
    if !rest.starts_with('v') {
        return None;
    }
    let body = rest.split_once('}').map(|(body, _)| body).unwrap_or(rest);
    let token = body.split_whitespace().next().unwrap_or_default();

    let mut version = Version::new();
    Some(
        version
            .push_str(token)
            .map(|_| version)
            .map_err(|_| ReplyError::VersionTooLong),
    )
}

/// Parse the single-character port id after `[NAME{`.
pub fn parse_port(line: &str, name: &str) -> Option<Result<PortId, ReplyError>> {
    let rest = payload(line, name)?;
    Some(match rest.chars().next() {
        None => Err(ReplyError::Empty),
        Some(c) => c
            .to_digit(10)
            .and_then(|d| PortId::new(d as u8))
            .ok_or(ReplyError::InvalidPort),
    })
}

/// Parse the hex literal in `[NAME{0xH}]`.
pub fn parse_mask(line: &str, name: &str) -> Option<Result<Mask, ReplyError>> {
    let rest = payload(line, name)?;
    Some(body(rest).and_then(|body| {
        let hex = body
            .trim()
            .strip_prefix("0x")
            .ok_or(ReplyError::InvalidHex)?;
        let bits = u8::from_str_radix(hex, 16).map_err(|_| ReplyError::InvalidHex)?;
        Mask::new(bits).ok_or(ReplyError::MaskOutOfRange)
    }))
}

/// Parse the `port,control` pair in `[NAME{p,c}]`.
pub fn parse_pair(line: &str, name: &str) -> Option<Result<PortState, ReplyError>> {
    let rest = payload(line, name)?;
    Some(body(rest).and_then(|body| {
        if body.trim().is_empty() {
            return Err(ReplyError::Empty);
        }
        let (port, control) = body.split_once(',').ok_or(ReplyError::InvalidPair)?;
        let port = port.trim().parse::<u8>().map_err(|_| ReplyError::InvalidPair)?;
        let control = control
            .trim()
            .parse::<u8>()
            .map_err(|_| ReplyError::InvalidPair)?;
        Ok(PortState {
            port: PortId::new(port).ok_or(ReplyError::InvalidPort)?,
            control: Control::from_digit(control).ok_or(ReplyError::InvalidControl)?,
        })
    }))
}

// --- Switch side: encoding ---

/// A reply as produced by the switch firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `[NAME{ok}]` for fire-and-forget commands.
    Ok(Command),
    /// Echo of a set command's arguments.
    Echo(Command),
    Version(Version),
    HostPort(PortId),
    DevicePort(PortId),
    RelayMask(Mask),
    PowerMask(Mask),
    Relay(PortState),
    Power(PortState),
}

impl Reply {
    pub fn encode(&self) -> Line {
        let mut line = Line::new();
        let _ = match self {
            Reply::Ok(cmd) => write!(line, "[{}{{ok}}]", cmd.name()),
            Reply::Echo(cmd) => {
                let _ = write!(line, "[{}{{", cmd.name());
                let _ = cmd.write_args(&mut line);
                write!(line, "}}]")
            }
            Reply::Version(version) => {
                write!(line, "[{}{{{}}}]", Command::GetVersion.name(), version)
            }
            Reply::HostPort(port) => write!(line, "[{}{{{}}}]", Command::GetHostPort.name(), port),
            Reply::DevicePort(port) => {
                write!(line, "[{}{{{}}}]", Command::GetDevicePort.name(), port)
            }
            Reply::RelayMask(mask) => {
                write!(line, "[{}{{{}}}]", Command::GetRelayMask.name(), mask)
            }
            Reply::PowerMask(mask) => {
                write!(line, "[{}{{{}}}]", Command::GetPowerMask.name(), mask)
            }
            Reply::Relay(state) => write!(line, "[GET_RELAY{{{},{}}}]", state.port, state.control),
            Reply::Power(state) => write!(line, "[GET_POWER{{{},{}}}]", state.port, state.control),
        };
        line
    }
}
