// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory switch doubles for driving the client without hardware.
//!
//! [`SimulatedSwitch`] decodes frames and answers like the firmware, keeping
//! its state across sessions. [`ScriptedConnector`] replays fixed reply lines
//! regardless of what was written.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use zuss::{Connector, Error, Link, Result, SessionConfig};
use zuss_common::protocol::{Command, Mask, PortId};
use zuss_common::reply::{PortState, Reply, Version};

/// Short deadlines so timeout tests finish quickly.
pub fn fast_config() -> SessionConfig {
    SessionConfig::default()
        .with_deadline(Duration::from_millis(50))
        .with_poll_interval(Duration::from_millis(1))
}

pub fn port(id: u8) -> PortId {
    PortId::new(id).unwrap()
}

// =============================================================================
// Simulated switch
// =============================================================================

#[derive(Debug, Clone)]
pub struct DeviceState {
    pub host_port: PortId,
    pub device_port: PortId,
    pub relay_mask: Mask,
    pub power_mask: Mask,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            host_port: port(1),
            device_port: port(1),
            relay_mask: Mask::NONE,
            power_mask: Mask::ALL,
        }
    }
}

#[derive(Debug, Default)]
pub struct SwitchState {
    pub device: DeviceState,
    pub saved: Option<DeviceState>,
    pub frames: Vec<String>,
    pub reboots: usize,
    /// Prefix firmware 2.x puts in front of replies.
    pub reply_prefix: &'static str,
    /// When set, the switch swallows every command.
    pub silent: bool,
}

/// Shared handle to one simulated switch.
#[derive(Clone, Default)]
pub struct SimulatedSwitch {
    pub state: Rc<RefCell<SwitchState>>,
    pub opens: Rc<Cell<usize>>,
    pub closes: Rc<Cell<usize>>,
}

impl SimulatedSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply_prefix(self, prefix: &'static str) -> Self {
        self.state.borrow_mut().reply_prefix = prefix;
        self
    }

    pub fn connector(&self) -> SimConnector {
        SimConnector {
            switch: self.clone(),
            config: fast_config(),
        }
    }

    pub fn frames(&self) -> Vec<String> {
        self.state.borrow().frames.clone()
    }
}

impl SwitchState {
    /// Handle one frame and return the lines the firmware prints.
    fn handle(&mut self, frame: &str) -> Vec<String> {
        self.frames.push(frame.to_string());
        if self.silent {
            return Vec::new();
        }

        let cmd = match Command::decode(frame) {
            Ok(cmd) => cmd,
            Err(e) => return vec![format!("Error: {}", e)],
        };

        let mut lines = Vec::new();
        let reply = match cmd {
            Command::GetVersion => {
                let mut version = Version::new();
                version.push_str("v2.0.7 Jun 09 2021").ok();
                Reply::Version(version)
            }
            Command::Reboot => {
                self.reboots += 1;
                lines.push("Rebooting...".to_string());
                Reply::Ok(cmd)
            }
            Command::SaveConfig => {
                self.saved = Some(self.device.clone());
                Reply::Ok(cmd)
            }
            Command::ClearConfig => {
                self.saved = None;
                self.device = DeviceState::default();
                Reply::Ok(cmd)
            }
            Command::DisplayConfig => {
                lines.push(format!("Host port: {}", self.device.host_port));
                lines.push(format!("Device port: {}", self.device.device_port));
                lines.push(format!("Relay mask: {}", self.device.relay_mask));
                lines.push(format!("Power mask: {}", self.device.power_mask));
                Reply::Ok(cmd)
            }
            Command::SetHostPort(p) => {
                self.device.host_port = p;
                Reply::Echo(cmd)
            }
            Command::GetHostPort => Reply::HostPort(self.device.host_port),
            Command::SetDevicePort(p) => {
                self.device.device_port = p;
                Reply::Echo(cmd)
            }
            Command::GetDevicePort => Reply::DevicePort(self.device.device_port),
            Command::SetRelayMask(m) => {
                self.device.relay_mask = m;
                Reply::Echo(cmd)
            }
            Command::GetRelayMask => Reply::RelayMask(self.device.relay_mask),
            Command::SetPowerMask(m) => {
                self.device.power_mask = m;
                Reply::Echo(cmd)
            }
            Command::GetPowerMask => Reply::PowerMask(self.device.power_mask),
            Command::SetRelay { relay, control } => {
                self.device.relay_mask = self.device.relay_mask.with(relay, control);
                Reply::Echo(cmd)
            }
            Command::GetRelay { relay } => Reply::Relay(PortState {
                port: relay,
                control: self.device.relay_mask.control(relay),
            }),
            Command::SetPower { device, control } => {
                self.device.power_mask = self.device.power_mask.with(device, control);
                Reply::Echo(cmd)
            }
            Command::GetPower { device } => Reply::Power(PortState {
                port: device,
                control: self.device.power_mask.control(device),
            }),
        };
        lines.push(format!("{}{}", self.reply_prefix, reply.encode()));
        lines
    }
}

pub struct SimConnector {
    pub switch: SimulatedSwitch,
    pub config: SessionConfig,
}

impl Connector for SimConnector {
    type Link = SimLink;

    fn port_name(&self) -> &str {
        "sim0"
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn open(&self) -> Result<SimLink> {
        self.switch.opens.set(self.switch.opens.get() + 1);
        Ok(SimLink {
            switch: self.switch.clone(),
            rx: VecDeque::new(),
            open: true,
        })
    }
}

pub struct SimLink {
    switch: SimulatedSwitch,
    rx: VecDeque<Vec<u8>>,
    open: bool,
}

impl Link for SimLink {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::Write("closed".into()));
        }
        let frame = String::from_utf8_lossy(data).to_string();
        let lines = self.switch.state.borrow_mut().handle(&frame);
        self.rx
            .extend(lines.into_iter().map(|l| format!("{}\r\n", l).into_bytes()));
        Ok(data.len())
    }

    fn bytes_pending(&mut self) -> Result<u32> {
        Ok(self.rx.iter().map(|l| l.len() as u32).sum())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.pop_front())
    }

    fn clear_input(&mut self) -> Result<usize> {
        Ok(self.rx.drain(..).map(|l| l.len()).sum())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.switch.closes.set(self.switch.closes.get() + 1);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

// =============================================================================
// Scripted link
// =============================================================================

/// Replies with the same fixed lines after every write.
#[derive(Clone)]
pub struct ScriptedConnector {
    pub lines: Vec<Vec<u8>>,
    /// Lines already waiting in the receive buffer when the port opens.
    pub stale: Vec<Vec<u8>>,
    /// Bytes thrown away by `clear_input`.
    pub discarded: Rc<Cell<usize>>,
    pub config: SessionConfig,
    pub written: Rc<RefCell<Vec<String>>>,
    pub opens: Rc<Cell<usize>>,
    pub closes: Rc<Cell<usize>>,
    pub unavailable: bool,
}

impl ScriptedConnector {
    pub fn new(lines: &[&[u8]]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_vec()).collect(),
            stale: Vec::new(),
            discarded: Rc::default(),
            config: fast_config(),
            written: Rc::default(),
            opens: Rc::default(),
            closes: Rc::default(),
            unavailable: false,
        }
    }

    /// A connector whose port can never be opened.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(&[])
        }
    }

    pub fn with_stale(mut self, lines: &[&[u8]]) -> Self {
        self.stale = lines.iter().map(|l| l.to_vec()).collect();
        self
    }

    pub fn written(&self) -> Vec<String> {
        self.written.borrow().clone()
    }
}

impl Connector for ScriptedConnector {
    type Link = ScriptedLink;

    fn port_name(&self) -> &str {
        "scripted0"
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn open(&self) -> Result<ScriptedLink> {
        if self.unavailable {
            return Err(Error::PortUnavailable {
                port: self.port_name().to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device"),
            });
        }
        self.opens.set(self.opens.get() + 1);
        Ok(ScriptedLink {
            script: self.clone(),
            rx: self.stale.iter().cloned().collect(),
            open: true,
        })
    }
}

pub struct ScriptedLink {
    script: ScriptedConnector,
    rx: VecDeque<Vec<u8>>,
    open: bool,
}

impl Link for ScriptedLink {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::Write("closed".into()));
        }
        self.script
            .written
            .borrow_mut()
            .push(String::from_utf8_lossy(data).to_string());
        self.rx.extend(self.script.lines.iter().cloned());
        Ok(data.len())
    }

    fn bytes_pending(&mut self) -> Result<u32> {
        Ok(self.rx.iter().map(|l| l.len() as u32).sum())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.pop_front())
    }

    fn clear_input(&mut self) -> Result<usize> {
        let bytes: usize = self.rx.drain(..).map(|l| l.len()).sum();
        self.script.discarded.set(self.script.discarded.get() + bytes);
        Ok(bytes)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.script.closes.set(self.script.closes.get() + 1);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
