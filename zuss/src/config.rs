// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial session configuration.

use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use zuss_common::protocol::{Command, BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};

/// Delay between checks of the receive buffer while waiting for a reply.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Line settings and reply timing for one serial session.
///
/// The defaults match the switch firmware: 115200 baud, 8N1, no flow
/// control, 2 s read timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    /// Upper bound for one blocking line read.
    pub read_timeout: Duration,
    /// Sleep between receive-buffer checks when no bytes are pending.
    pub poll_interval: Duration,
    /// Overrides the per-command reply deadline when set.
    pub deadline: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            deadline: None,
        }
    }
}

impl SessionConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Use the same reply deadline for every command.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// How long to keep reading lines for the reply to `cmd`.
    pub fn deadline_for(&self, cmd: &Command) -> Duration {
        self.deadline
            .unwrap_or_else(|| Duration::from_millis(cmd.reply_deadline_ms()))
    }
}
