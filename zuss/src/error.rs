// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error types for the switch driver.
//!
//! A reply that never arrives is not an error: boolean operations report
//! `false` and queries report `None`. Errors are reserved for a port that
//! cannot be used, a reply that cannot be decoded, and bad arguments.

use zuss_common::ReplyError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The serial device could not be opened (missing, busy, no permission).
    #[error("serial port {port} unavailable: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Writing the command frame failed or the handle was already closed.
    #[error("write failed: {0}")]
    Write(String),

    /// The reply prefix was found but its payload did not decode.
    #[error("malformed reply to {command}: {reason} (line {line:?})")]
    MalformedReply {
        command: &'static str,
        line: String,
        #[source]
        reason: ReplyError,
    },

    /// An argument is outside the range the switch accepts.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
