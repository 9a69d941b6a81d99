//! VESC wire format
//!
//! Concrete [`PacketCodec`](crate::protocol::PacketCodec) for VESC
//! controllers: framing, CRC-16 checksums, outbound commands and the
//! telemetry packets the firmware answers with.

pub mod commands;
mod crc;
mod frame;
mod packet;

pub use commands::Command;
pub use crc::crc16;
pub use frame::{
    encode_frame, PacketBuilder, VescCodec, EOF_VAL, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
    MIN_FRAME_SIZE, SOF_LARGE_FRAME, SOF_SMALL_FRAME,
};
pub use packet::{FwVersion, Payload, Values, VescPacket, VALUES_PAYLOAD_SIZE};
