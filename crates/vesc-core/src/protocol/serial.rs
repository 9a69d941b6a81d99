//! Serial port transport
//!
//! [`SerialTransport`] opens the port once and keeps two handles to it: one
//! owned by the read path and one by the write path, so a frame reader
//! parked in a bounded read never delays a command write.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::transport::{LinkSettings, Transport};
use super::{lock, ProtocolError};

/// Granularity of a single port read; cancellation is observed between slices
const READ_SLICE: Duration = Duration::from_millis(20);

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (Some(usb.vid), Some(usb.pid), usb.product),
            _ => (None, None, None),
        };

        Self {
            name: info.port_name,
            vid,
            pid,
            product,
        }
    }
}

/// ttyACM* first (the VESC enumerates as CDC ACM), then ttyUSB*, then the rest
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List available serial ports in a deterministic order
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

/// Apply the fixed 8N1, no flow control line settings
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
    Ok(())
}

/// [`Transport`] backed by a local serial port
#[derive(Default)]
pub struct SerialTransport {
    rx: Mutex<Option<Box<dyn SerialPort>>>,
    tx: Mutex<Option<Box<dyn SerialPort>>>,
    open: AtomicBool,
    cancelled: AtomicBool,
}

impl SerialTransport {
    /// Create a closed transport
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for SerialTransport {
    fn open(&self, address: &str, settings: &LinkSettings) -> Result<(), ProtocolError> {
        let mut port = serialport::new(address, settings.baud_rate)
            .timeout(READ_SLICE.min(settings.read_timeout))
            .open()
            .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
        configure_port(port.as_mut())?;

        let reader = port
            .try_clone()
            .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;

        *lock(&self.rx) = Some(reader);
        *lock(&self.tx) = Some(port);
        self.cancelled.store(false, Ordering::Release);
        self.open.store(true, Ordering::Release);

        tracing::debug!(
            "serial port {} opened at {} baud",
            address,
            settings.baud_rate
        );
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.cancelled.store(true, Ordering::Release);
        lock(&self.tx).take();
        lock(&self.rx).take();
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn read(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut guard = lock(&self.rx);
        let port = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port is closed"))?;

        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        while filled < buf.len() && !self.cancelled.load(Ordering::Acquire) {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                // Hand back what already arrived; the error resurfaces on the next read
                Err(_) if filled > 0 => break,
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        Ok(filled)
    }

    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        let mut guard = lock(&self.tx);
        let port = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port is closed"))?;

        let written = port.write(bytes)?;
        port.flush()?;
        Ok(written)
    }

    fn cancel_read(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports() {
        // Only checks that enumeration does not panic on this host
        let ports = list_ports();
        for port in &ports {
            println!("Found port: {} - {:?}", port.name, port.product);
        }
    }

    #[test]
    fn test_port_sorting() {
        let mut names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyACM10",
        ];
        names.sort_by_key(|n| port_sort_key(n));

        assert_eq!(
            names,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_closed_transport() {
        let transport = SerialTransport::new();
        assert!(!transport.is_open());

        let mut buf = [0u8; 8];
        let err = transport
            .read(&mut buf, Duration::from_millis(1))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);

        let err = transport.write(&[0x02]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);

        // Closing twice is fine
        transport.close();
        transport.close();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let transport = SerialTransport::new();
        let result = transport.open("/dev/does-not-exist-vesc", &LinkSettings::default());
        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
        assert!(!transport.is_open());
    }
}
