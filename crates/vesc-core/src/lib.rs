//! # vesc-core
//!
//! Serial transport driver for VESC motor controllers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A frame reader that recovers packet boundaries from a noisy byte stream
//! - A transport seam with a `serialport` implementation
//! - The VESC wire format: framing, CRC-16, commands and telemetry packets
//! - A connection manager that runs the reader on a background thread
//!
//! ## Example
//!
//! ```rust,no_run
//! use vesc_core::prelude::*;
//!
//! let vesc = VescInterface::open(
//!     "/dev/ttyACM0",
//!     |packet: VescPacket| println!("{}: {:?}", packet.name(), packet.contents()),
//!     |warning: &LinkWarning| eprintln!("{}", warning),
//! )?;
//!
//! vesc.request_fw_version()?;
//! vesc.set_current(2.5)?;
//! vesc.disconnect();
//! # Ok::<(), vesc_core::protocol::ProtocolError>(())
//! ```

pub mod config;
pub mod protocol;
pub mod vesc;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::DriverConfig;
    pub use crate::protocol::{
        ConnectionState, DecodedPacket, LinkWarning, PacketCodec, ProtocolError, Transport,
        VescInterface,
    };
    pub use crate::vesc::{Command, FwVersion, Payload, Values, VescCodec, VescPacket};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
