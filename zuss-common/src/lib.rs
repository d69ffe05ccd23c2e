// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and utilities for the ZD USB switch command protocol.
//!
//! This crate supports both `no_std` and `std` environments:
//! - Default: `no_std` mode, usable from switch firmware or simulators
//! - `std` feature: Enables `std::error::Error` support for host tools
//!
//! The protocol is line-oriented ASCII. The host sends `<NAME{args}>` and
//! the switch answers with a line containing `[NAME{args}]`.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod protocol;
pub mod reply;

// Re-export commonly used types
pub use protocol::{Command, Control, Frame, FrameError, Mask, PortId};
pub use protocol::{BAUD_RATE, FRAME_CAPACITY, PORT_COUNT};
pub use reply::{PortState, Reply, ReplyError, Version};
