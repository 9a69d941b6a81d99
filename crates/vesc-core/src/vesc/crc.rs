//! CRC-16/XMODEM as used by VESC frames (poly 0x1021, init 0, no reflection)

const POLY: u16 = 0x1021;

/// Checksum over a frame payload
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &b in bytes {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}
