//! Decoded VESC packets

use std::io::Cursor;
use std::ops::Range;

use byteorder::{BigEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use super::commands::id;
use crate::protocol::codec::DecodedPacket;

/// Payload size of a telemetry response, id byte included
pub const VALUES_PAYLOAD_SIZE: usize = 54;

/// Firmware version reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FwVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

/// Telemetry snapshot (`GET_VALUES` response)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Values {
    /// MOSFET temperature, °C
    pub temp_fet: f64,
    /// Motor temperature, °C
    pub temp_motor: f64,
    /// Motor current, A
    pub current_motor: f64,
    /// Input current, A
    pub current_input: f64,
    /// Average d-axis current, A
    pub current_d: f64,
    /// Average q-axis current, A
    pub current_q: f64,
    /// Duty cycle, -1.0 to 1.0
    pub duty_cycle: f64,
    /// Electrical RPM
    pub rpm: f64,
    /// Input voltage, V
    pub voltage_input: f64,
    /// Consumed charge, Ah
    pub amp_hours: f64,
    /// Regenerated charge, Ah
    pub amp_hours_charged: f64,
    /// Consumed energy, Wh
    pub watt_hours: f64,
    /// Regenerated energy, Wh
    pub watt_hours_charged: f64,
    /// Signed tachometer count
    pub tachometer: i32,
    /// Absolute tachometer count
    pub tachometer_abs: i32,
    /// Firmware fault code, 0 when healthy
    pub fault_code: u8,
}

impl Values {
    fn parse(payload: &[u8]) -> std::io::Result<Self> {
        // Skip the id byte
        let mut cur = Cursor::new(&payload[1..]);
        Ok(Self {
            temp_fet: cur.read_i16::<BigEndian>()? as f64 / 10.0,
            temp_motor: cur.read_i16::<BigEndian>()? as f64 / 10.0,
            current_motor: cur.read_i32::<BigEndian>()? as f64 / 100.0,
            current_input: cur.read_i32::<BigEndian>()? as f64 / 100.0,
            current_d: cur.read_i32::<BigEndian>()? as f64 / 100.0,
            current_q: cur.read_i32::<BigEndian>()? as f64 / 100.0,
            duty_cycle: cur.read_i16::<BigEndian>()? as f64 / 1000.0,
            rpm: cur.read_i32::<BigEndian>()? as f64,
            voltage_input: cur.read_i16::<BigEndian>()? as f64 / 10.0,
            amp_hours: cur.read_i32::<BigEndian>()? as f64 / 10000.0,
            amp_hours_charged: cur.read_i32::<BigEndian>()? as f64 / 10000.0,
            watt_hours: cur.read_i32::<BigEndian>()? as f64 / 10000.0,
            watt_hours_charged: cur.read_i32::<BigEndian>()? as f64 / 10000.0,
            tachometer: cur.read_i32::<BigEndian>()?,
            tachometer_abs: cur.read_i32::<BigEndian>()?,
            fault_code: cur.read_u8()?,
        })
    }
}

/// Typed packet contents
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Firmware version response
    FwVersion(FwVersion),
    /// Telemetry response
    Values(Values),
    /// Any command id this driver does not interpret
    Other {
        /// Command id byte
        command: u8,
        /// Payload after the id byte
        data: Vec<u8>,
    },
}

/// A packet decoded from one frame
#[derive(Debug, Clone, PartialEq)]
pub struct VescPacket {
    frame: Vec<u8>,
    payload: Range<usize>,
    contents: Payload,
}

impl VescPacket {
    /// Interpret a verified frame; `payload` is the payload span inside it
    pub(crate) fn from_frame(frame: Vec<u8>, payload: Range<usize>) -> Result<Self, String> {
        let bytes = &frame[payload.clone()];
        let command = bytes[0];

        let contents = match command {
            id::FW_VERSION => {
                if bytes.len() < 3 {
                    return Err(format!(
                        "Firmware version payload too short: {} bytes",
                        bytes.len()
                    ));
                }
                Payload::FwVersion(FwVersion {
                    major: bytes[1],
                    minor: bytes[2],
                })
            }
            id::GET_VALUES => {
                if bytes.len() < VALUES_PAYLOAD_SIZE {
                    return Err(format!(
                        "Values payload too short: {} bytes, expected {}",
                        bytes.len(),
                        VALUES_PAYLOAD_SIZE
                    ));
                }
                Payload::Values(Values::parse(bytes).map_err(|e| e.to_string())?)
            }
            other => Payload::Other {
                command: other,
                data: bytes[1..].to_vec(),
            },
        };

        Ok(Self {
            frame,
            payload,
            contents,
        })
    }

    /// Typed contents
    pub fn contents(&self) -> &Payload {
        &self.contents
    }

    /// Payload bytes, id included
    pub fn payload(&self) -> &[u8] {
        &self.frame[self.payload.clone()]
    }

    /// Command id byte
    pub fn command(&self) -> u8 {
        self.payload()[0]
    }
}

impl DecodedPacket for VescPacket {
    fn frame(&self) -> &[u8] {
        &self.frame
    }

    fn name(&self) -> &str {
        match self.contents {
            Payload::FwVersion(_) => "FWVersion",
            Payload::Values(_) => "Values",
            Payload::Other { .. } => "Unknown",
        }
    }
}
