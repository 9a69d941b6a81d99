//! Byte link abstraction

use std::io;
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};

/// Physical link parameters applied when a transport is opened.
///
/// Flow control, parity and stop bits are fixed (none, none, one); only the
/// values that affect framing timing are carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Baud rate
    pub baud_rate: u32,
    /// Upper bound for a single bounded read
    pub read_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
        }
    }
}

/// Abstraction over the byte link to the controller.
///
/// Reads and writes may be issued from different threads at the same time.
/// Implementations serialize writes against each other but must not make a
/// write wait for a pending read.
pub trait Transport: Send + Sync {
    /// Open and configure the link. On failure the transport stays closed.
    fn open(&self, address: &str, settings: &LinkSettings) -> Result<(), ProtocolError>;

    /// Close the link. Calling it on a closed transport does nothing.
    fn close(&self);

    /// Whether the link is currently open
    fn is_open(&self) -> bool;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns the number of bytes read, which is zero when nothing arrived
    /// in time. Returns early once [`Transport::cancel_read`] was called.
    fn read(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write `bytes` once, returning how many were accepted.
    fn write(&self, bytes: &[u8]) -> io::Result<usize>;

    /// Make pending and future reads return promptly until the next `open`.
    fn cancel_read(&self);
}

/// Whether a read error means the link itself is gone
pub(crate) fn is_link_lost(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof
    )
}
