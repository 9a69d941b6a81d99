//! Shared test fixtures: a scripted in-memory transport and a collector
//! for dispatched packets and warnings.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use vesc_core::config::DriverConfig;
use vesc_core::protocol::{Dispatch, LinkSettings, LinkWarning, ProtocolError, Transport};
use vesc_core::vesc::VescPacket;

/// One scripted outcome of `Transport::read`
#[derive(Debug, Clone)]
pub enum ReadStep {
    /// Bytes to hand out; split across reads when larger than the request
    Data(Vec<u8>),
    /// A read that returns nothing
    Timeout,
    /// A read that fails
    Error(io::ErrorKind),
}

#[derive(Default)]
struct MockState {
    script: VecDeque<ReadStep>,
    written: Vec<Vec<u8>>,
    write_limit: Option<usize>,
    fail_open: Option<String>,
    cancelled: bool,
    opened: Vec<String>,
}

/// In-memory transport driven by a read script
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    wake: Condvar,
    open: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_script(steps: impl IntoIterator<Item = ReadStep>) -> Arc<Self> {
        let mock = Self::new();
        for step in steps {
            mock.push(step);
        }
        mock
    }

    pub fn push(&self, step: ReadStep) {
        self.state.lock().unwrap().script.push_back(step);
        self.wake.notify_all();
    }

    pub fn push_read(&self, bytes: &[u8]) {
        self.push(ReadStep::Data(bytes.to_vec()));
    }

    /// Accept at most `limit` bytes per write
    pub fn limit_writes(&self, limit: usize) {
        self.state.lock().unwrap().write_limit = Some(limit);
    }

    pub fn fail_open(&self, reason: &str) {
        self.state.lock().unwrap().fail_open = Some(reason.to_string());
    }

    /// Every accepted write, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }

    /// Addresses passed to successful opens
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }
}

impl Transport for MockTransport {
    fn open(&self, address: &str, _settings: &LinkSettings) -> Result<(), ProtocolError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.fail_open {
            return Err(ProtocolError::ConnectionFailed(reason.clone()));
        }
        state.opened.push(address.to_string());
        state.cancelled = false;
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.wake.notify_all();
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn read(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();

        loop {
            if state.cancelled {
                return Ok(0);
            }

            match state.script.pop_front() {
                Some(ReadStep::Data(mut bytes)) => {
                    let n = buf.len().min(bytes.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        let rest = bytes.split_off(n);
                        state.script.push_front(ReadStep::Data(rest));
                    }
                    return Ok(n);
                }
                Some(ReadStep::Timeout) => return Ok(0),
                Some(ReadStep::Error(kind)) => {
                    return Err(io::Error::new(kind, "scripted read failure"))
                }
                None => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(0);
                    }
                    state = self.wake.wait_timeout(state, deadline - now).unwrap().0;
                }
            }
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        if !self.is_open() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        let mut state = self.state.lock().unwrap();
        let n = state.write_limit.map_or(bytes.len(), |limit| limit.min(bytes.len()));
        state.written.push(bytes[..n].to_vec());
        Ok(n)
    }

    fn cancel_read(&self) {
        self.state.lock().unwrap().cancelled = true;
        self.wake.notify_all();
    }
}

/// Records everything the frame reader dispatches
#[derive(Clone, Default)]
pub struct Collector {
    pub packets: Arc<Mutex<Vec<VescPacket>>>,
    pub warnings: Arc<Mutex<Vec<LinkWarning>>>,
}

impl Collector {
    pub fn dispatch(&self) -> Dispatch<VescPacket> {
        let packets = Arc::clone(&self.packets);
        let warnings = Arc::clone(&self.warnings);
        Dispatch::new(
            move |packet| packets.lock().unwrap().push(packet),
            move |warning: &LinkWarning| warnings.lock().unwrap().push(warning.clone()),
        )
    }

    pub fn packets(&self) -> Vec<VescPacket> {
        self.packets.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<LinkWarning> {
        self.warnings.lock().unwrap().clone()
    }

    /// Total bytes reported as skipped or discarded
    pub fn dropped_bytes(&self) -> usize {
        self.warnings().iter().map(LinkWarning::dropped_bytes).sum()
    }

    /// Poll until `count` packets arrived or two seconds passed
    pub fn wait_for_packets(&self, count: usize) -> bool {
        wait_until(Duration::from_secs(2), || self.packets.lock().unwrap().len() >= count)
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Short timings so tests do not idle
pub fn fast_config() -> DriverConfig {
    DriverConfig {
        read_timeout_ms: 20,
        poll_interval_ms: 1,
        ..DriverConfig::default()
    }
}
