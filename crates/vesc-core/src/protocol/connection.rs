//! Connection management
//!
//! [`VescInterface`] owns the transport and the background frame reader.
//! Connecting opens the link and starts the reader thread; disconnecting
//! stops the reader first and closes the link afterwards. Commands are
//! written from the caller's thread and never wait for the reader.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::codec::PacketCodec;
use super::dispatch::Dispatch;
use super::reader::FrameReader;
use super::serial::SerialTransport;
use super::transport::Transport;
use super::{lock, LinkWarning, ProtocolError};
use crate::config::DriverConfig;
use crate::vesc::{Command, VescCodec};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Link closed, no reader running
    Disconnected,
    /// Link open, reader running
    Connected,
}

struct ReaderHandle {
    running: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

impl ReaderHandle {
    /// Ask the reader to stop and wait for it.
    ///
    /// Called from a handler on the reader thread itself, the join is
    /// skipped and the loop exits once the handler returns.
    fn stop(self, transport: &dyn Transport) -> Result<(), ProtocolError> {
        self.running.store(false, Ordering::Release);
        let _ = self.stop_tx.send(());
        transport.cancel_read();

        if thread::current().id() == self.thread.thread().id() {
            return Ok(());
        }
        self.thread.join().map_err(|_| ProtocolError::ReaderPanicked)
    }
}

/// Lifecycle and command surface of one controller link
pub struct VescInterface<C: PacketCodec = VescCodec> {
    transport: Arc<dyn Transport>,
    codec: Arc<C>,
    config: DriverConfig,
    dispatch: Mutex<Dispatch<C::Packet>>,
    reader: Mutex<Option<ReaderHandle>>,
    write_lock: Mutex<()>,
}

impl<C: PacketCodec> VescInterface<C> {
    /// Create a disconnected interface with the default configuration
    pub fn new(transport: Arc<dyn Transport>, codec: C) -> Self {
        Self::with_config(transport, codec, DriverConfig::default())
    }

    /// Create a disconnected interface
    pub fn with_config(transport: Arc<dyn Transport>, codec: C, config: DriverConfig) -> Self {
        Self {
            transport,
            codec: Arc::new(codec),
            config,
            dispatch: Mutex::new(Dispatch::default()),
            reader: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Replace both handlers. Only allowed while disconnected.
    pub fn set_dispatch(&self, dispatch: Dispatch<C::Packet>) -> Result<(), ProtocolError> {
        let mut current = lock(&self.dispatch);
        if self.is_connected() {
            return Err(ProtocolError::AlreadyConnected);
        }
        *current = dispatch;
        Ok(())
    }

    /// Set the handler called for every decoded packet.
    ///
    /// The handler runs on the reader thread. Only allowed while
    /// disconnected; the reader captures its handlers when it starts.
    pub fn set_packet_handler<F>(&self, handler: F) -> Result<(), ProtocolError>
    where
        F: Fn(C::Packet) + Send + Sync + 'static,
    {
        let mut dispatch = lock(&self.dispatch);
        if self.is_connected() {
            return Err(ProtocolError::AlreadyConnected);
        }
        dispatch.set_packet_handler(Arc::new(handler));
        Ok(())
    }

    /// Set the handler called for every receive-side warning
    pub fn set_error_handler<E>(&self, handler: E) -> Result<(), ProtocolError>
    where
        E: Fn(&LinkWarning) + Send + Sync + 'static,
    {
        let mut dispatch = lock(&self.dispatch);
        if self.is_connected() {
            return Err(ProtocolError::AlreadyConnected);
        }
        dispatch.set_error_handler(Arc::new(handler));
        Ok(())
    }

    /// Open the link and start the frame reader
    pub fn connect(&self, address: &str) -> Result<(), ProtocolError> {
        let mut reader = lock(&self.reader);

        if self.transport.is_open() {
            return Err(ProtocolError::AlreadyConnected);
        }

        // The reader exits by itself when the link drops; reap it
        if let Some(stale) = reader.take() {
            if let Err(e) = stale.stop(self.transport.as_ref()) {
                tracing::warn!("previous frame reader ended abnormally: {}", e);
            }
        }

        // Held until the reader has its copy, so handler setters either
        // land before the link opens or see it open
        let dispatch = lock(&self.dispatch);

        self.transport
            .open(address, &self.config.link_settings())
            .map_err(|e| {
                let reason = match e {
                    ProtocolError::ConnectionFailed(msg) => msg,
                    other => other.to_string(),
                };
                ProtocolError::ConnectionFailed(format!(
                    "Failed to open the serial port {} to the VESC. {}",
                    address, reason
                ))
            })?;

        let running = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = mpsc::channel();
        let frame_reader = FrameReader {
            codec: Arc::clone(&self.codec),
            transport: Arc::clone(&self.transport),
            dispatch: dispatch.clone(),
            timing: self.config.reader_timing(),
            running: Arc::clone(&running),
            stop_rx,
        };

        let thread = match thread::Builder::new()
            .name("vesc-rx".to_string())
            .spawn(move || frame_reader.run())
        {
            Ok(thread) => thread,
            Err(e) => {
                self.transport.close();
                return Err(ProtocolError::ConnectionFailed(format!(
                    "Failed to start frame reader: {}",
                    e
                )));
            }
        };

        *reader = Some(ReaderHandle {
            running,
            stop_tx,
            thread,
        });

        tracing::info!("Connected to VESC on {}", address);
        Ok(())
    }

    /// Stop the frame reader and close the link.
    ///
    /// Does nothing when not connected. A panicked reader thread is logged
    /// and the link is closed anyway. Handlers may call this too.
    pub fn disconnect(&self) {
        // Not held across the join, a handler may be waiting for it
        let handle = lock(&self.reader).take();

        match handle {
            Some(handle) => {
                if let Err(e) = handle.stop(self.transport.as_ref()) {
                    tracing::warn!("{}", e);
                }
            }
            None if !self.transport.is_open() => return,
            None => {}
        }
        self.transport.close();

        tracing::info!("Disconnected from VESC");
    }

    /// Whether the link is open
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Write an encoded frame. Short writes are errors and are not retried.
    pub fn send(&self, frame: &[u8]) -> Result<(), ProtocolError> {
        if !self.transport.is_open() {
            return Err(ProtocolError::NotConnected);
        }

        let _guard = lock(&self.write_lock);
        let written = self
            .transport
            .write(frame)
            .map_err(|e| ProtocolError::SendFailed(e.to_string()))?;

        if written != frame.len() {
            return Err(ProtocolError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        Ok(())
    }
}

impl VescInterface<VescCodec> {
    /// Disconnected interface over a local serial port
    pub fn serial(config: DriverConfig) -> Self {
        Self::with_config(Arc::new(SerialTransport::new()), VescCodec, config)
    }

    /// Install handlers and, unless `port` is empty, connect right away
    pub fn open<F, E>(port: &str, packet_handler: F, error_handler: E) -> Result<Self, ProtocolError>
    where
        F: Fn(crate::vesc::VescPacket) + Send + Sync + 'static,
        E: Fn(&LinkWarning) + Send + Sync + 'static,
    {
        let interface = Self::serial(DriverConfig::default());
        interface.set_dispatch(Dispatch::new(packet_handler, error_handler))?;
        if !port.is_empty() {
            interface.connect(port)?;
        }
        Ok(interface)
    }

    /// Encode and send a command
    pub fn send_command(&self, command: Command) -> Result<(), ProtocolError> {
        tracing::trace!("sending {:?}", command);
        self.send(&command.encode())
    }

    /// Ask for the firmware version
    pub fn request_fw_version(&self) -> Result<(), ProtocolError> {
        self.send_command(Command::RequestFwVersion)
    }

    /// Ask for a telemetry snapshot
    pub fn request_state(&self) -> Result<(), ProtocolError> {
        self.send_command(Command::RequestValues)
    }

    /// Duty cycle, -1.0 to 1.0
    pub fn set_duty_cycle(&self, duty_cycle: f64) -> Result<(), ProtocolError> {
        self.send_command(Command::SetDuty(duty_cycle))
    }

    /// Motor current in amps
    pub fn set_current(&self, current: f64) -> Result<(), ProtocolError> {
        self.send_command(Command::SetCurrent(current))
    }

    /// Brake current in amps
    pub fn set_brake(&self, brake: f64) -> Result<(), ProtocolError> {
        self.send_command(Command::SetCurrentBrake(brake))
    }

    /// Speed in electrical RPM
    pub fn set_speed(&self, speed: f64) -> Result<(), ProtocolError> {
        self.send_command(Command::SetRpm(speed))
    }

    /// Position in degrees
    pub fn set_position(&self, position: f64) -> Result<(), ProtocolError> {
        self.send_command(Command::SetPosition(position))
    }

    /// Servo position, 0.0 to 1.0
    pub fn set_servo(&self, servo: f64) -> Result<(), ProtocolError> {
        self.send_command(Command::SetServoPosition(servo))
    }
}

impl<C: PacketCodec> Drop for VescInterface<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
