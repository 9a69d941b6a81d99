//! VESC commands
//!
//! Outbound commands and the command ids they carry as the first payload
//! byte. Setpoints are scaled to the fixed-point integers the firmware
//! expects; no range checking is done here.

use serde::{Deserialize, Serialize};

use super::frame::PacketBuilder;

/// Command ids used by this driver
pub mod id {
    /// Firmware version request / response
    pub const FW_VERSION: u8 = 0;
    /// Telemetry request / response
    pub const GET_VALUES: u8 = 4;
    /// Duty cycle setpoint
    pub const SET_DUTY: u8 = 5;
    /// Motor current setpoint
    pub const SET_CURRENT: u8 = 6;
    /// Brake current setpoint
    pub const SET_CURRENT_BRAKE: u8 = 7;
    /// Electrical RPM setpoint
    pub const SET_RPM: u8 = 8;
    /// Position setpoint
    pub const SET_POS: u8 = 9;
    /// Servo output position
    pub const SET_SERVO_POS: u8 = 12;
}

/// Commands sent to the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Ask for the firmware version
    RequestFwVersion,

    /// Ask for a telemetry snapshot
    RequestValues,

    /// Duty cycle, -1.0 to 1.0
    SetDuty(f64),

    /// Motor current in amps
    SetCurrent(f64),

    /// Brake current in amps
    SetCurrentBrake(f64),

    /// Speed in electrical RPM
    SetRpm(f64),

    /// Position in degrees
    SetPosition(f64),

    /// Servo position, 0.0 to 1.0
    SetServoPosition(f64),
}

impl Command {
    /// Command id byte
    pub fn id(&self) -> u8 {
        match self {
            Command::RequestFwVersion => id::FW_VERSION,
            Command::RequestValues => id::GET_VALUES,
            Command::SetDuty(_) => id::SET_DUTY,
            Command::SetCurrent(_) => id::SET_CURRENT,
            Command::SetCurrentBrake(_) => id::SET_CURRENT_BRAKE,
            Command::SetRpm(_) => id::SET_RPM,
            Command::SetPosition(_) => id::SET_POS,
            Command::SetServoPosition(_) => id::SET_SERVO_POS,
        }
    }

    /// Payload bytes, id included
    pub fn payload(&self) -> Vec<u8> {
        let builder = PacketBuilder::new().command(self.id());
        let builder = match *self {
            Command::RequestFwVersion | Command::RequestValues => builder,
            Command::SetDuty(duty) => builder.i32_be((duty * 100_000.0) as i32),
            Command::SetCurrent(current) => builder.i32_be((current * 1_000.0) as i32),
            Command::SetCurrentBrake(brake) => builder.i32_be((brake * 1_000.0) as i32),
            Command::SetRpm(rpm) => builder.i32_be(rpm as i32),
            Command::SetPosition(position) => builder.i32_be((position * 1_000_000.0) as i32),
            Command::SetServoPosition(servo) => builder.i16_be((servo * 1_000.0) as i16),
        };
        builder.into_payload()
    }

    /// Complete encoded frame
    pub fn encode(&self) -> Vec<u8> {
        super::frame::encode_frame(&self.payload())
    }
}
