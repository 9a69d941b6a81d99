//! Packet and warning dispatch
//!
//! The frame reader reports everything through two handlers. They are
//! captured when the reader starts and are not touched again until it stops.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::LinkWarning;

/// Called once per decoded packet, in stream order
pub type PacketHandler<P> = Arc<dyn Fn(P) + Send + Sync>;

/// Called once per receive-side warning
pub type ErrorHandler = Arc<dyn Fn(&LinkWarning) + Send + Sync>;

/// The pair of handlers the frame reader reports to
pub struct Dispatch<P> {
    packet: PacketHandler<P>,
    error: ErrorHandler,
}

impl<P> Dispatch<P> {
    /// Build a dispatch from two closures
    pub fn new<F, E>(packet: F, error: E) -> Self
    where
        F: Fn(P) + Send + Sync + 'static,
        E: Fn(&LinkWarning) + Send + Sync + 'static,
    {
        Self {
            packet: Arc::new(packet),
            error: Arc::new(error),
        }
    }

    /// Replace the packet handler
    pub fn set_packet_handler(&mut self, handler: PacketHandler<P>) {
        self.packet = handler;
    }

    /// Replace the error handler
    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.error = handler;
    }

    pub(crate) fn packet(&self, packet: P) {
        (self.packet)(packet);
    }

    pub(crate) fn warn(&self, warning: LinkWarning) {
        tracing::debug!("link warning: {}", warning);
        (self.error)(&warning);
    }
}

impl<P> Clone for Dispatch<P> {
    fn clone(&self) -> Self {
        Self {
            packet: Arc::clone(&self.packet),
            error: Arc::clone(&self.error),
        }
    }
}

impl<P> Default for Dispatch<P> {
    /// Handlers that drop everything
    fn default() -> Self {
        Self {
            packet: Arc::new(|_| {}),
            error: Arc::new(|_| {}),
        }
    }
}

/// Receiving ends of [`channel_dispatch`]
pub struct DispatchReceivers<P> {
    /// Decoded packets in stream order
    pub packets: mpsc::UnboundedReceiver<P>,
    /// Warnings in the order they were reported
    pub warnings: mpsc::UnboundedReceiver<LinkWarning>,
}

/// Dispatch that forwards packets and warnings onto tokio channels.
///
/// Sending never blocks the reader thread. Items sent after the receivers
/// are dropped are discarded.
pub fn channel_dispatch<P: Send + 'static>() -> (Dispatch<P>, DispatchReceivers<P>) {
    let (packet_tx, packets) = mpsc::unbounded_channel();
    let (warning_tx, warnings) = mpsc::unbounded_channel();

    let dispatch = Dispatch::new(
        move |packet| {
            let _ = packet_tx.send(packet);
        },
        move |warning: &LinkWarning| {
            let _ = warning_tx.send(warning.clone());
        },
    );

    (dispatch, DispatchReceivers { packets, warnings })
}
