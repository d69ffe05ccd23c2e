// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command frames for host -> switch communication.
//!
//! Every command is a single ASCII frame of the form `<NAME{args}>`. The
//! argument list is empty, a decimal port id, a `0x`-prefixed 4-bit mask or a
//! `port,control` pair. Frames are built into fixed-capacity strings so this
//! module works without an allocator.

use core::fmt::{self, Write};

use heapless::String;

// --- Serial link constants ---

pub const BAUD_RATE: u32 = 115_200;

/// Default read timeout used by the reference SDK, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;

/// Number of host ports, device ports and relays on the switch.
pub const PORT_COUNT: u8 = 4;

/// Capacity of an encoded command frame or acknowledgment token.
pub const FRAME_CAPACITY: usize = 32;

pub const FRAME_START: char = '<';
pub const FRAME_END: char = '>';

/// An encoded command frame such as `<SET_HOST_PORT{2}>`.
pub type Frame = String<FRAME_CAPACITY>;

// --- Argument types ---

/// A 1-based port, relay or device index (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(u8);

impl PortId {
    pub fn new(id: u8) -> Option<Self> {
        (1..=PORT_COUNT).contains(&id).then_some(Self(id))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Bit position of this port inside a [`Mask`].
    pub fn bit(self) -> u8 {
        self.0 - 1
    }

    /// All ports in ascending order.
    pub fn all() -> impl Iterator<Item = PortId> {
        (1..=PORT_COUNT).map(PortId)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relay or power control value: 0 = off/open, 1 = on/closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Off,
    On,
}

impl Control {
    pub fn from_digit(value: u8) -> Option<Self> {
        match value {
            0 => Some(Control::Off),
            1 => Some(Control::On),
            _ => None,
        }
    }

    pub fn as_digit(self) -> u8 {
        match self {
            Control::Off => 0,
            Control::On => 1,
        }
    }

    pub fn is_on(self) -> bool {
        self == Control::On
    }
}

impl From<bool> for Control {
    fn from(on: bool) -> Self {
        if on {
            Control::On
        } else {
            Control::Off
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_digit())
    }
}

/// 4-bit relay or power mask. Bit k controls port k+1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mask(u8);

impl Mask {
    pub const MAX: u8 = 0x0F;
    pub const NONE: Mask = Mask(0);
    pub const ALL: Mask = Mask(Self::MAX);

    pub fn new(bits: u8) -> Option<Self> {
        (bits <= Self::MAX).then_some(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn control(self, port: PortId) -> Control {
        Control::from(self.0 & (1 << port.bit()) != 0)
    }

    /// Return a copy of this mask with `port` switched to `control`.
    pub fn with(self, port: PortId, control: Control) -> Self {
        let bit = 1 << port.bit();
        match control {
            Control::On => Self(self.0 | bit),
            Control::Off => Self(self.0 & !bit),
        }
    }

    /// Per-port view of the mask, port 1 first.
    pub fn states(self) -> impl Iterator<Item = (PortId, Control)> {
        PortId::all().map(move |port| (port, self.control(port)))
    }
}

/// Formats like the device expects: lower case, no padding (`0xa`).
impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// --- Commands ---

/// Errors when decoding a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not wrapped in '<' and '>'")]
    MissingDelimiters,
    #[error("frame arguments are not wrapped in '{{' and '}}'")]
    MissingBraces,
    #[error("unknown command name")]
    UnknownCommand,
    #[error("invalid command argument")]
    BadArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetVersion,
    Reboot,
    /// Persist the current configuration to flash.
    SaveConfig,
    /// Reset the stored configuration to factory defaults.
    ClearConfig,
    /// Ask the switch to print its RAM configuration.
    DisplayConfig,
    SetHostPort(PortId),
    GetHostPort,
    SetDevicePort(PortId),
    GetDevicePort,
    SetRelayMask(Mask),
    GetRelayMask,
    SetPowerMask(Mask),
    GetPowerMask,
    SetRelay { relay: PortId, control: Control },
    GetRelay { relay: PortId },
    SetPower { device: PortId, control: Control },
    GetPower { device: PortId },
}

impl Command {
    /// Command name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetVersion => "GET_SW_VERSION",
            Command::Reboot => "REBOOT_SYS",
            Command::SaveConfig => "SAVE_CONFIG",
            Command::ClearConfig => "CLEAR_CONFIG",
            Command::DisplayConfig => "DISP_CONFIG",
            Command::SetHostPort(_) => "SET_HOST_PORT",
            Command::GetHostPort => "GET_HOST_PORT",
            Command::SetDevicePort(_) => "SET_DEVICE_PORT",
            Command::GetDevicePort => "GET_DEVICE_PORT",
            Command::SetRelayMask(_) => "SET_RELAY_MASK",
            Command::GetRelayMask => "GET_RELAY_MASK",
            Command::SetPowerMask(_) => "SET_POWER_MASK",
            Command::GetPowerMask => "GET_POWER_MASK",
            Command::SetRelay { .. } => "SET_RELAY",
            Command::GetRelay { .. } => "GET_RELAY",
            Command::SetPower { .. } => "SET_POWER",
            Command::GetPower { .. } => "GET_POWER",
        }
    }

    /// Write the argument list (without braces).
    pub fn write_args<W: Write>(&self, out: &mut W) -> fmt::Result {
        match self {
            Command::SetHostPort(port) | Command::SetDevicePort(port) => write!(out, "{}", port),
            Command::SetRelayMask(mask) | Command::SetPowerMask(mask) => write!(out, "{}", mask),
            Command::SetRelay { relay: port, control }
            | Command::SetPower {
                device: port,
                control,
            } => write!(out, "{},{}", port, control),
            Command::GetRelay { relay: port } | Command::GetPower { device: port } => {
                write!(out, "{}", port)
            }
            _ => Ok(()),
        }
    }

    /// Encode the outbound frame, e.g. `<SET_RELAY{2,1}>`.
    pub fn encode(&self) -> Frame {
        let mut frame = Frame::new();
        // Longest frame is well under FRAME_CAPACITY
        let _ = write!(frame, "{}{}{{", FRAME_START, self.name());
        let _ = self.write_args(&mut frame);
        let _ = write!(frame, "}}{}", FRAME_END);
        frame
    }

    /// Token whose presence in a reply line means the command succeeded.
    ///
    /// Set commands echo their arguments, fire-and-forget commands answer
    /// `{ok}`. Queries return `None`; their replies are parsed by the
    /// functions in [`crate::reply`].
    pub fn ack_token(&self) -> Option<Frame> {
        let mut token = Frame::new();
        match self {
            // The reboot acknowledgment is matched without its brackets.
            Command::Reboot => {
                let _ = write!(token, "{}{{ok}}", self.name());
            }
            Command::SaveConfig | Command::ClearConfig | Command::DisplayConfig => {
                let _ = write!(token, "[{}{{ok}}]", self.name());
            }
            Command::SetHostPort(_)
            | Command::SetDevicePort(_)
            | Command::SetRelayMask(_)
            | Command::SetPowerMask(_)
            | Command::SetRelay { .. }
            | Command::SetPower { .. } => {
                let _ = write!(token, "[{}{{", self.name());
                let _ = self.write_args(&mut token);
                token.push_str("}]").ok()?;
            }
            _ => return None,
        }
        Some(token)
    }

    pub fn is_query(&self) -> bool {
        self.ack_token().is_none()
    }

    /// How long the host keeps reading lines before giving up on a reply.
    pub fn reply_deadline_ms(&self) -> u64 {
        match self {
            Command::GetVersion => 500,
            Command::Reboot => 10_000,
            Command::SetHostPort(_)
            | Command::SetDevicePort(_)
            | Command::SetRelay { .. }
            | Command::GetRelay { .. }
            | Command::SetPower { .. }
            | Command::GetPower { .. } => 2000,
            _ => 1000,
        }
    }

    /// Decode a `<NAME{args}>` frame, as the switch firmware does.
    pub fn decode(frame: &str) -> Result<Command, FrameError> {
        let inner = frame
            .trim()
            .strip_prefix(FRAME_START)
            .and_then(|s| s.strip_suffix(FRAME_END))
            .ok_or(FrameError::MissingDelimiters)?;
        let (name, args) = inner.split_once('{').ok_or(FrameError::MissingBraces)?;
        let args = args.strip_suffix('}').ok_or(FrameError::MissingBraces)?;

        let no_args = |cmd: Command| {
            if args.is_empty() {
                Ok(cmd)
            } else {
                Err(FrameError::BadArgument)
            }
        };

        match name {
            "GET_SW_VERSION" => no_args(Command::GetVersion),
            "REBOOT_SYS" => no_args(Command::Reboot),
            "SAVE_CONFIG" => no_args(Command::SaveConfig),
            "CLEAR_CONFIG" => no_args(Command::ClearConfig),
            "DISP_CONFIG" => no_args(Command::DisplayConfig),
            "GET_HOST_PORT" => no_args(Command::GetHostPort),
            "GET_DEVICE_PORT" => no_args(Command::GetDevicePort),
            "GET_RELAY_MASK" => no_args(Command::GetRelayMask),
            "GET_POWER_MASK" => no_args(Command::GetPowerMask),
            "SET_HOST_PORT" => decode_port(args).map(Command::SetHostPort),
            "SET_DEVICE_PORT" => decode_port(args).map(Command::SetDevicePort),
            "SET_RELAY_MASK" => decode_mask(args).map(Command::SetRelayMask),
            "SET_POWER_MASK" => decode_mask(args).map(Command::SetPowerMask),
            "GET_RELAY" => decode_port(args).map(|relay| Command::GetRelay { relay }),
            "GET_POWER" => decode_port(args).map(|device| Command::GetPower { device }),
            "SET_RELAY" => {
                let (relay, control) = decode_pair(args)?;
                Ok(Command::SetRelay { relay, control })
            }
            "SET_POWER" => {
                let (device, control) = decode_pair(args)?;
                Ok(Command::SetPower { device, control })
            }
            _ => Err(FrameError::UnknownCommand),
        }
    }
}

/// Displays the encoded frame.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn decode_port(args: &str) -> Result<PortId, FrameError> {
    args.trim()
        .parse::<u8>()
        .ok()
        .and_then(PortId::new)
        .ok_or(FrameError::BadArgument)
}

fn decode_mask(args: &str) -> Result<Mask, FrameError> {
    let args = args.trim();
    let hex = args
        .strip_prefix("0x")
        .or_else(|| args.strip_prefix("0X"))
        .ok_or(FrameError::BadArgument)?;
    u8::from_str_radix(hex, 16)
        .ok()
        .and_then(Mask::new)
        .ok_or(FrameError::BadArgument)
}

fn decode_pair(args: &str) -> Result<(PortId, Control), FrameError> {
    let (port, control) = args.split_once(',').ok_or(FrameError::BadArgument)?;
    let port = decode_port(port)?;
    let control = control
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(Control::from_digit)
        .ok_or(FrameError::BadArgument)?;
    Ok((port, control))
}
