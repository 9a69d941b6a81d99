//! Frame reader
//!
//! Recovers frame boundaries from the raw byte stream. [`FrameScanner`] holds
//! the accumulation buffer and implements one scan pass; [`FrameReader`]
//! wraps it in the background polling loop that pulls bytes from the
//! transport.
//!
//! A scan pass walks the buffer one byte at a time. At every start-of-frame
//! marker the codec is asked for a packet:
//!
//! - a packet is dispatched and scanning resumes right after its frame, so
//!   every complete frame in the buffer is drained in one pass;
//! - an inconclusive decode ends the pass and keeps the candidate for the
//!   next read;
//! - a malformed frame is reported and the marker byte is treated as noise.
//!
//! Bytes that never became part of a packet are reported once and dropped
//! in the same pass, so nothing is scanned or reported twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use super::codec::{Decode, DecodedPacket, PacketCodec};
use super::dispatch::Dispatch;
use super::transport::{is_link_lost, Transport};
use super::LinkWarning;

/// Accumulation buffer plus the scan/resynchronization pass
#[derive(Debug)]
pub struct FrameScanner {
    buffer: Vec<u8>,
    chunk_capacity: usize,
}

impl FrameScanner {
    /// Create a scanner whose read requests never exceed `chunk_capacity`
    pub fn new(chunk_capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(chunk_capacity),
            chunk_capacity: chunk_capacity.max(1),
        }
    }

    /// Append freshly read bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Run one scan pass over the buffer.
    ///
    /// Decoded packets go to `on_packet` in stream order, warnings to
    /// `on_warning`. Returns how many bytes to request from the transport
    /// next.
    pub fn scan<C, F, W>(&mut self, codec: &C, mut on_packet: F, mut on_warning: W) -> usize
    where
        C: PacketCodec + ?Sized,
        F: FnMut(C::Packet),
        W: FnMut(LinkWarning),
    {
        let min_frame = codec.min_frame_size().max(1);
        let mut needed = min_frame;

        if !self.buffer.is_empty() {
            let len = self.buffer.len();
            // `begin` is one past the last dispatched frame
            let mut begin = 0;
            let mut pos = 0;

            while pos < len {
                if codec.is_start_of_frame(self.buffer[pos]) {
                    match codec.decode(&self.buffer[pos..]) {
                        Decode::Packet(packet) => {
                            if pos > begin {
                                on_warning(LinkWarning::SkippedLeading { count: pos - begin });
                            }
                            let consumed = packet.frame().len().clamp(1, len - pos);
                            on_packet(packet);
                            pos += consumed;
                            begin = pos;
                            continue;
                        }
                        Decode::NeedMore(more) => {
                            needed = more.max(1);
                            break;
                        }
                        Decode::Malformed(reason) => {
                            on_warning(LinkWarning::MalformedFrame(reason));
                        }
                    }
                }
                pos += 1;
            }

            if pos == len {
                needed = min_frame;
            }

            if pos > begin {
                on_warning(LinkWarning::Discarded { count: pos - begin });
            }
            self.buffer.drain(..pos);
        }

        needed.min(self.chunk_capacity)
    }
}

/// Timing parameters for the background loop
#[derive(Debug, Clone, Copy)]
pub struct ReaderTiming {
    /// Upper bound for one transport read
    pub read_timeout: Duration,
    /// Wait between loop iterations
    pub poll_interval: Duration,
    /// Capacity of the fixed read chunk
    pub chunk_size: usize,
}

/// Background loop feeding a [`FrameScanner`] from a transport
pub(crate) struct FrameReader<C: PacketCodec> {
    pub(crate) codec: Arc<C>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) dispatch: Dispatch<C::Packet>,
    pub(crate) timing: ReaderTiming,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) stop_rx: Receiver<()>,
}

impl<C: PacketCodec> FrameReader<C> {
    pub(crate) fn run(self) {
        tracing::debug!("frame reader started");

        let mut scanner = FrameScanner::new(self.timing.chunk_size);
        let mut chunk = vec![0u8; self.timing.chunk_size.max(1)];

        while self.running.load(Ordering::Acquire) {
            let to_read = scanner.scan(
                self.codec.as_ref(),
                |packet| {
                    tracing::trace!("dispatching {} packet", packet.name());
                    self.dispatch.packet(packet);
                },
                |warning| self.dispatch.warn(warning),
            );

            // A handler may have stopped the reader
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            match self.transport.read(&mut chunk[..to_read], self.timing.read_timeout) {
                Ok(n) => {
                    scanner.extend(&chunk[..n]);
                    if !self.running.load(Ordering::Acquire) {
                        break;
                    }
                    if to_read > 0 && n == 0 && !scanner.is_empty() {
                        self.dispatch.warn(LinkWarning::ReadTimeout);
                    }
                }
                Err(e) if is_link_lost(&e) => {
                    if self.running.load(Ordering::Acquire) {
                        tracing::warn!("serial link lost: {}", e);
                        self.dispatch.warn(LinkWarning::Io(e.to_string()));
                        self.transport.close();
                    }
                    break;
                }
                Err(e) => self.dispatch.warn(LinkWarning::Io(e.to_string())),
            }

            match self.stop_rx.recv_timeout(self.timing.poll_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::debug!("frame reader stopped");
    }
}
