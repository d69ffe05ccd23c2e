// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for switch communication.
//!
//! [`Link`] is one open line-oriented connection and [`Connector`] opens a
//! new one per session. The serial implementations sit on top of the
//! `serialport` crate; tests substitute in-memory links.

use std::io::{self, Read, Write};

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

/// Line terminator used by the switch.
pub const LINE_END: u8 = b'\n';

/// An open connection to the switch.
pub trait Link {
    /// Write a frame and flush it. Fails with [`Error::Write`] when closed.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Number of received bytes waiting to be read, without blocking.
    fn bytes_pending(&mut self) -> Result<u32>;

    /// Read up to and including the next `\n`.
    ///
    /// Returns `None` if the read timeout elapsed with nothing received; a
    /// partial line received before the timeout is returned as-is.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>>;

    /// Discard everything received but not yet read, e.g. a reply that
    /// arrived after its command timed out. Returns the number of bytes
    /// dropped.
    fn clear_input(&mut self) -> Result<usize>;

    /// Release the connection. Safe to call more than once.
    fn close(&mut self);

    /// `false` once [`Link::close`] has been called.
    fn is_open(&self) -> bool;
}

/// Opens links to one switch.
pub trait Connector {
    type Link: Link;

    fn port_name(&self) -> &str;

    fn config(&self) -> &SessionConfig;

    /// Fails with [`Error::PortUnavailable`] if the device cannot be opened.
    fn open(&self) -> Result<Self::Link>;
}

/// A [`Link`] over a serial port.
pub struct SerialLink {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    /// Open `port_name` with the line settings in `config`.
    pub fn open(port_name: &str, config: &SessionConfig) -> Result<Self> {
        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .parity(config.parity)
            .flow_control(config.flow_control)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| Error::PortUnavailable {
                port: port_name.to_string(),
                source,
            })?;

        debug!(port = port_name, baud = config.baud_rate, "serial port opened");
        Ok(Self::from_port(port_name, port))
    }

    /// Wrap a port that is already open and configured.
    pub fn from_port(name: impl Into<String>, port: Box<dyn SerialPort>) -> Self {
        Self {
            name: name.into(),
            port: Some(port),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.name
    }
}

impl Link for SerialLink {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| Error::Write("serial port is closed".to_string()))?;
        port.write_all(data)
            .map_err(|e| Error::Write(format!("failed to write to {}: {}", self.name, e)))?;
        port.flush()
            .map_err(|e| Error::Write(format!("failed to flush {}: {}", self.name, e)))?;
        trace!(port = %self.name, bytes = data.len(), "frame written");
        Ok(data.len())
    }

    fn bytes_pending(&mut self) -> Result<u32> {
        match self.port.as_ref() {
            Some(port) => Ok(port.bytes_to_read().map_err(io::Error::from)?),
            None => Ok(0),
        }
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(port) = self.port.as_mut() else {
            return Ok(None);
        };

        let mut line = Vec::with_capacity(64);
        let mut byte = [0u8; 1];

        // Read until we get the line terminator or the port times out
        loop {
            match port.read(&mut byte) {
                Ok(1) => {
                    line.push(byte[0]);
                    if byte[0] == LINE_END {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok((!line.is_empty()).then_some(line))
    }

    fn clear_input(&mut self) -> Result<usize> {
        let Some(port) = self.port.as_mut() else {
            return Ok(0);
        };

        let mut buf = [0u8; 64];
        let mut discarded = 0;
        while port.bytes_to_read().map_err(io::Error::from)? > 0 {
            match port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => discarded += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(discarded)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.name, "serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

/// Opens a fresh [`SerialLink`] to a fixed port for every session.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port: String,
    config: SessionConfig,
}

impl SerialConnector {
    pub fn new(port: impl Into<String>) -> Self {
        Self::with_config(port, SessionConfig::default())
    }

    pub fn with_config(port: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            port: port.into(),
            config,
        }
    }
}

impl Connector for SerialConnector {
    type Link = SerialLink;

    fn port_name(&self) -> &str {
        &self.port
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn open(&self) -> Result<SerialLink> {
        SerialLink::open(&self.port, &self.config)
    }
}
