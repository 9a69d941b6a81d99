//! Packet codec contract
//!
//! The frame reader knows nothing about payload layout or checksums. It only
//! asks a [`PacketCodec`] whether a byte can start a frame and whether the
//! bytes from that position on form a complete packet.

/// A packet produced by a codec.
pub trait DecodedPacket {
    /// The raw frame bytes this packet was decoded from.
    ///
    /// Its length is the number of stream bytes the packet consumed.
    fn frame(&self) -> &[u8];

    /// Human-readable packet type, used for logging and dispatch
    fn name(&self) -> &str;
}

/// Outcome of a single decode attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Decode<P> {
    /// A complete packet starts the window
    Packet(P),
    /// Inconclusive; at least this many more bytes are required
    NeedMore(usize),
    /// The window starts with an invalid frame
    Malformed(String),
}

/// Converts a candidate byte window into packets.
pub trait PacketCodec: Send + Sync + 'static {
    /// Packet type handed to the packet handler
    type Packet: DecodedPacket + Send + 'static;

    /// Whether `byte` is one of the reserved start-of-frame values
    fn is_start_of_frame(&self, byte: u8) -> bool;

    /// Smallest possible encoded frame
    fn min_frame_size(&self) -> usize;

    /// Try to decode one packet from the start of `window`.
    ///
    /// `window[0]` is always a start-of-frame marker.
    fn decode(&self, window: &[u8]) -> Decode<Self::Packet>;
}
