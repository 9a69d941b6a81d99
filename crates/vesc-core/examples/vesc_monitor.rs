//! VESC Monitor
//!
//! Connects to a VESC, asks for the firmware version once and then polls
//! telemetry, printing every decoded packet and link warning.
//!
//! Usage:
//!   cargo run --example vesc_monitor -- [OPTIONS] [PORT]
//!
//! Options:
//!   --config FILE     Driver configuration (JSON)
//!   --interval MS     Telemetry poll interval in ms (default: 500)
//!   --count N         Number of polls before exiting (default: 20)
//!   --list            List serial ports and exit
//!
//! Set `RUST_LOG=vesc_core=debug` to see reader activity.

use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use vesc_core::prelude::*;
use vesc_core::protocol::list_ports;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name = "/dev/ttyACM0".to_string();
    let mut config = DriverConfig::default();
    let mut interval_ms = 500u64;
    let mut count = 20u32;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).context("--config needs a file")?;
                config = DriverConfig::from_file(path)
                    .with_context(|| format!("loading {}", path))?;
            }
            "--interval" | "-i" => {
                i += 1;
                if let Some(value) = args.get(i) {
                    interval_ms = value.parse().unwrap_or(500);
                }
            }
            "--count" | "-n" => {
                i += 1;
                if let Some(value) = args.get(i) {
                    count = value.parse().unwrap_or(20);
                }
            }
            "--list" | "-l" => {
                for port in list_ports() {
                    println!(
                        "{:<20} {}",
                        port.name,
                        port.product.as_deref().unwrap_or("")
                    );
                }
                return Ok(());
            }
            other => port_name = other.to_string(),
        }
        i += 1;
    }

    let vesc = VescInterface::serial(config);
    vesc.set_packet_handler(|packet: VescPacket| match packet.contents() {
        Payload::FwVersion(fw) => println!("Firmware {}.{}", fw.major, fw.minor),
        Payload::Values(values) => println!(
            "{:>8.0} erpm  {:>6.2} A  {:>5.1} V  duty {:>5.3}  fet {:>4.1} °C  fault {}",
            values.rpm,
            values.current_motor,
            values.voltage_input,
            values.duty_cycle,
            values.temp_fet,
            values.fault_code
        ),
        Payload::Other { command, data } => {
            println!("Packet {} ({} bytes)", command, data.len())
        }
    })?;
    vesc.set_error_handler(|warning: &LinkWarning| eprintln!("warning: {}", warning))?;

    vesc.connect(&port_name)?;
    println!("Connected to {}", port_name);

    vesc.request_fw_version()?;
    for _ in 0..count {
        thread::sleep(Duration::from_millis(interval_ms));
        vesc.request_state()?;
    }

    vesc.disconnect();
    Ok(())
}
