//! VESC frame encoding/decoding
//!
//! Frame format:
//! - 1 byte: start of frame (0x02 small, 0x03 large)
//! - 1 byte (small) or 2 bytes big-endian (large): payload length
//! - N bytes: payload, first byte is the command id
//! - 2 bytes: CRC-16/XMODEM of the payload (big-endian)
//! - 1 byte: end of frame (0x03)

use byteorder::{BigEndian, ByteOrder};

use super::crc::crc16;
use super::packet::VescPacket;
use crate::protocol::codec::{Decode, PacketCodec};

/// Start of a frame with a one byte length field
pub const SOF_SMALL_FRAME: u8 = 0x02;
/// Start of a frame with a two byte length field
pub const SOF_LARGE_FRAME: u8 = 0x03;
/// End of frame
pub const EOF_VAL: u8 = 0x03;

/// Smallest possible frame (small frame with an empty payload)
pub const MIN_FRAME_SIZE: usize = 5;
/// Largest payload the firmware sends
pub const MAX_PAYLOAD_SIZE: usize = 1024;
/// Largest possible frame
pub const MAX_FRAME_SIZE: usize = 6 + MAX_PAYLOAD_SIZE;

/// Wrap a payload into a frame, picking the small variant when it fits
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= u16::MAX as usize);

    let mut frame = Vec::with_capacity(payload.len() + 6);
    if payload.len() <= u8::MAX as usize {
        frame.push(SOF_SMALL_FRAME);
        frame.push(payload.len() as u8);
    } else {
        let mut len = [0u8; 2];
        BigEndian::write_u16(&mut len, payload.len() as u16);
        frame.push(SOF_LARGE_FRAME);
        frame.extend_from_slice(&len);
    }
    frame.extend_from_slice(payload);

    let mut crc = [0u8; 2];
    BigEndian::write_u16(&mut crc, crc16(payload));
    frame.extend_from_slice(&crc);
    frame.push(EOF_VAL);
    frame
}

/// Builder for command payloads
#[derive(Debug, Default)]
pub struct PacketBuilder {
    payload: Vec<u8>,
}

impl PacketBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the command id byte
    pub fn command(mut self, id: u8) -> Self {
        self.payload.push(id);
        self
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.payload.push(b);
        self
    }

    /// Add a 16-bit signed value (big-endian)
    pub fn i16_be(mut self, value: i16) -> Self {
        let mut bytes = [0u8; 2];
        BigEndian::write_i16(&mut bytes, value);
        self.payload.extend_from_slice(&bytes);
        self
    }

    /// Add a 32-bit signed value (big-endian)
    pub fn i32_be(mut self, value: i32) -> Self {
        let mut bytes = [0u8; 4];
        BigEndian::write_i32(&mut bytes, value);
        self.payload.extend_from_slice(&bytes);
        self
    }

    /// Add raw bytes
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.payload.extend_from_slice(data);
        self
    }

    /// Payload without framing
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Framed bytes ready to send
    pub fn build(self) -> Vec<u8> {
        encode_frame(&self.payload)
    }
}

/// [`PacketCodec`] for the VESC serial protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct VescCodec;

impl PacketCodec for VescCodec {
    type Packet = VescPacket;

    fn is_start_of_frame(&self, byte: u8) -> bool {
        byte == SOF_SMALL_FRAME || byte == SOF_LARGE_FRAME
    }

    fn min_frame_size(&self) -> usize {
        MIN_FRAME_SIZE
    }

    fn decode(&self, window: &[u8]) -> Decode<VescPacket> {
        if window.len() < MIN_FRAME_SIZE {
            return Decode::NeedMore(MIN_FRAME_SIZE - window.len());
        }

        let (payload_len, payload_start) = match window[0] {
            SOF_SMALL_FRAME => (window[1] as usize, 2),
            SOF_LARGE_FRAME => (BigEndian::read_u16(&window[1..3]) as usize, 3),
            other => {
                return Decode::Malformed(format!(
                    "Invalid start-of-frame character 0x{:02x}",
                    other
                ))
            }
        };

        if payload_len == 0 {
            return Decode::Malformed("Frame payload length is zero".to_string());
        }
        if payload_len > MAX_PAYLOAD_SIZE {
            return Decode::Malformed(format!(
                "Frame payload length {} exceeds maximum {}",
                payload_len, MAX_PAYLOAD_SIZE
            ));
        }

        let frame_len = payload_start + payload_len + 3;
        if window.len() < frame_len {
            return Decode::NeedMore(frame_len - window.len());
        }

        let frame = &window[..frame_len];
        if frame[frame_len - 1] != EOF_VAL {
            return Decode::Malformed(format!(
                "Frame terminated with invalid end-of-frame character 0x{:02x}",
                frame[frame_len - 1]
            ));
        }

        let payload_end = payload_start + payload_len;
        let expected = crc16(&frame[payload_start..payload_end]);
        let actual = BigEndian::read_u16(&frame[payload_end..payload_end + 2]);
        if expected != actual {
            return Decode::Malformed(format!(
                "Invalid frame checksum: expected {:#06x}, got {:#06x}",
                expected, actual
            ));
        }

        match VescPacket::from_frame(frame.to_vec(), payload_start..payload_end) {
            Ok(packet) => Decode::Packet(packet),
            Err(reason) => Decode::Malformed(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::DecodedPacket;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_small_frame() {
        assert_eq!(
            encode_frame(&[0x00, 0x06, 0x02]),
            vec![0x02, 0x03, 0x00, 0x06, 0x02, 0x8A, 0xE4, 0x03]
        );
    }

    #[test]
    fn test_encode_large_frame() {
        let payload = vec![0x42; 300];
        let frame = encode_frame(&payload);
        assert_eq!(&frame[..3], &[0x03, 0x01, 0x2C]);
        assert_eq!(frame.len(), 300 + 6);
        assert_eq!(*frame.last().unwrap(), EOF_VAL);
    }

    #[test]
    fn test_builder() {
        let frame = PacketBuilder::new().command(0x05).i32_be(50_000).build();
        assert_eq!(frame, encode_frame(&[0x05, 0x00, 0x00, 0xC3, 0x50]));
        let payload = PacketBuilder::new().byte(1).bytes(&[2, 3]).into_payload();
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_fw_version() {
        let frame = encode_frame(&[0x00, 0x06, 0x02]);
        match VescCodec.decode(&frame) {
            Decode::Packet(packet) => {
                assert_eq!(packet.frame(), frame.as_slice());
                assert_eq!(packet.name(), "FWVersion");
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut window = encode_frame(&[0x00, 0x06, 0x02]);
        window.extend([0xAA, 0xBB]);
        match VescCodec.decode(&window) {
            Decode::Packet(packet) => assert_eq!(packet.frame().len(), 8),
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_large_frame() {
        let mut payload = vec![0x32];
        payload.extend(vec![0x11; 299]);
        let frame = encode_frame(&payload);
        match VescCodec.decode(&frame) {
            Decode::Packet(packet) => assert_eq!(packet.frame().len(), 306),
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_needs_more() {
        let frame = encode_frame(&[0x00, 0x06, 0x02]);
        assert_eq!(VescCodec.decode(&frame[..2]), Decode::NeedMore(3));
        assert_eq!(VescCodec.decode(&frame[..6]), Decode::NeedMore(2));
    }

    #[test]
    fn test_decode_zero_length() {
        let window = [0x02, 0x00, 0x00, 0x00, 0x03];
        assert!(matches!(VescCodec.decode(&window), Decode::Malformed(_)));
    }

    #[test]
    fn test_decode_oversized_payload() {
        // 0x0500 = 1280 bytes
        let window = [0x03, 0x05, 0x00, 0x00, 0x00];
        assert!(matches!(VescCodec.decode(&window), Decode::Malformed(_)));
    }

    #[test]
    fn test_decode_bad_eof() {
        let mut frame = encode_frame(&[0x00, 0x06, 0x02]);
        let last = frame.len() - 1;
        frame[last] = 0x7F;
        assert!(matches!(VescCodec.decode(&frame), Decode::Malformed(_)));
    }

    #[test]
    fn test_decode_bad_crc() {
        let mut frame = encode_frame(&[0x00, 0x06, 0x02]);
        frame[5] ^= 0xFF;
        match VescCodec.decode(&frame) {
            Decode::Malformed(reason) => assert!(reason.contains("checksum")),
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_markers() {
        assert!(VescCodec.is_start_of_frame(0x02));
        assert!(VescCodec.is_start_of_frame(0x03));
        assert!(!VescCodec.is_start_of_frame(0x00));
        assert_eq!(VescCodec.min_frame_size(), MIN_FRAME_SIZE);
    }
}
