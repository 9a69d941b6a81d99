//! Protocol errors and receive-side warnings

use std::fmt;

use thiserror::Error;

/// Errors surfaced synchronously by lifecycle and send calls
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The link could not be opened or configured
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// `connect` was called while a connection is already open
    #[error("Already connected to serial port")]
    AlreadyConnected,

    /// An operation needing an open link was called while disconnected
    #[error("Not connected to VESC")]
    NotConnected,

    /// The transport accepted fewer bytes than the frame holds
    #[error("Wrote {written} bytes, expected {expected}")]
    ShortWrite {
        /// Bytes the transport reported as written
        written: usize,
        /// Size of the frame handed to `send`
        expected: usize,
    },

    /// The transport failed while writing a frame
    #[error("Failed to send frame to VESC: {0}")]
    SendFailed(String),

    /// The background reader panicked instead of exiting cleanly
    #[error("Frame reader thread panicked")]
    ReaderPanicked,

    /// Invalid driver configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Underlying I/O failure, e.g. reading a config file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Non-fatal conditions observed by the frame reader.
///
/// These never stop the reader; they are handed to the error handler and the
/// stream keeps being processed. `Display` renders the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkWarning {
    /// Unrecognized bytes preceded a frame that decoded successfully
    SkippedLeading {
        /// Number of bytes dropped in front of the frame
        count: usize,
    },
    /// Bytes dropped at the end of a scan pass without yielding a frame
    Discarded {
        /// Number of bytes dropped
        count: usize,
    },
    /// The codec rejected a frame starting at a start-of-frame marker
    MalformedFrame(String),
    /// A read returned nothing while a partial frame was buffered
    ReadTimeout,
    /// The transport failed while reading
    Io(String),
}

impl fmt::Display for LinkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkWarning::SkippedLeading { count } => write!(
                f,
                "Out-of-sync with VESC, unknown data leading valid frame. Discarding {} bytes.",
                count
            ),
            LinkWarning::Discarded { count } => {
                write!(f, "Out-of-sync with VESC, discarding {} bytes.", count)
            }
            LinkWarning::MalformedFrame(reason) => f.write_str(reason),
            LinkWarning::ReadTimeout => f.write_str(
                "Possibly out-of-sync with VESC, read timeout in the middle of a frame.",
            ),
            LinkWarning::Io(reason) => write!(f, "Serial port communication error: {}", reason),
        }
    }
}

impl LinkWarning {
    /// Number of stream bytes this warning reports as dropped
    pub fn dropped_bytes(&self) -> usize {
        match self {
            LinkWarning::SkippedLeading { count } | LinkWarning::Discarded { count } => *count,
            _ => 0,
        }
    }
}
