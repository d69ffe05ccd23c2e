// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host-side driver for the ZD USB switch.
//!
//! ```no_run
//! use zuss::UsbSwitch;
//!
//! let switch = UsbSwitch::new("/dev/ttyUSB0");
//! if switch.set_host_port(2)? {
//!     println!("host port is now {:?}", switch.get_host_port()?);
//! }
//! # Ok::<(), zuss::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod ports;
pub mod transport;

pub use client::{Session, UsbSwitch};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use ports::{list_ports, PortInfo};
pub use transport::{Connector, Link, SerialConnector, SerialLink};

pub use zuss_common::{Command, Control, Mask, PortId, PortState, Version};
