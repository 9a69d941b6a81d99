//! Serial Protocol Communication
//!
//! Transport-agnostic plumbing for framed controller links: the byte
//! [`Transport`] seam, the [`PacketCodec`] contract, the background frame
//! reader that resynchronizes on a noisy stream, and the [`VescInterface`]
//! connection manager that ties them together.

pub mod codec;
mod connection;
pub mod dispatch;
mod error;
pub mod reader;
pub mod serial;
pub mod transport;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use codec::{Decode, DecodedPacket, PacketCodec};
pub use connection::{ConnectionState, VescInterface};
pub use dispatch::{channel_dispatch, Dispatch, DispatchReceivers, ErrorHandler, PacketHandler};
pub use error::{LinkWarning, ProtocolError};
pub use reader::{FrameScanner, ReaderTiming};
pub use serial::{configure_port, list_ports, PortInfo, SerialTransport};
pub use transport::{LinkSettings, Transport};

/// Default baud rate for VESC communication
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default upper bound for one bounded read in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Default pause between frame reader iterations in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Default capacity of the frame reader's read chunk
pub const READ_CHUNK_SIZE: usize = 4096;

/// Lock a mutex, recovering the guard if a handler panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
