use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use log::debug;
use serialport::SerialPort;
use crate::drivers::encoder::Command;
use crate::drivers::error::StimError;
/// Default line speed of the stimulator firmware.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;
/// What a transport can promise about delivered bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// The device confirms each command. No shipped transport does; writes are
    /// fire-and-forget and success only means the bytes were queued.
    pub acknowledged: bool,
}
/// Byte sink for one stimulator link.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), StimError>;
    fn close(&mut self) -> Result<(), StimError>;
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::default()
    }
    fn describe(&self) -> String;
}
/// Serial line parameters for one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}
impl SerialSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::ZERO,
        }
    }
}
/// Transport backed by a real serial port.
pub struct SerialTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}
impl SerialTransport {
    pub fn open(settings: &SerialSettings) -> Result<Self, StimError> {
        let port = serialport::new(&settings.path, settings.baud_rate)
            .timeout(settings.timeout)
            .open()?;
        debug!(
            "opened {} at {} baud (timeout {:?})",
            settings.path, settings.baud_rate, settings.timeout
        );
        Ok(Self {
            path: settings.path.clone(),
            port: Some(port),
        })
    }
}
impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), StimError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| StimError::Transport(format!("{} is closed", self.path)))?;
        port.write_all(bytes)?;
        Ok(())
    }
    fn close(&mut self) -> Result<(), StimError> {
        // dropping the handle releases the OS port
        if self.port.take().is_none() {
            return Err(StimError::Transport(format!("{} already closed", self.path)));
        }
        Ok(())
    }
    fn describe(&self) -> String {
        self.path.clone()
    }
}
#[derive(Debug, Default)]
struct WireState {
    writes: Vec<Vec<u8>>,
    failing: bool,
    closed: bool,
}
/// Shared view of everything a `MemoryTransport` was asked to send.
#[derive(Clone, Debug, Default)]
pub struct WireLog {
    state: Arc<Mutex<WireState>>,
}
impl WireLog {
    fn lock(&self) -> MutexGuard<'_, WireState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
    /// Concatenated bytes in write order.
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().writes.concat()
    }
    /// Individual write calls, one entry per call.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }
    /// Recorded bytes parsed back into commands.
    pub fn commands(&self) -> Vec<Command> {
        Command::decode_stream(&self.bytes())
    }
    pub fn clear(&self) {
        self.lock().writes.clear();
    }
    /// Makes every following write fail, as an unplugged device would.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
/// In-memory transport used for dry runs and deterministic tests.
pub struct MemoryTransport {
    label: String,
    log: WireLog,
}
impl MemoryTransport {
    pub fn new(label: impl Into<String>) -> (Self, WireLog) {
        let log = WireLog::default();
        let transport = Self {
            label: label.into(),
            log: log.clone(),
        };
        (transport, log)
    }
}
impl Transport for MemoryTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), StimError> {
        let mut state = self.log.lock();
        if state.closed {
            return Err(StimError::Transport(format!("{} is closed", self.label)));
        }
        if state.failing {
            return Err(StimError::Transport(format!("{}: write refused", self.label)));
        }
        state.writes.push(bytes.to_vec());
        Ok(())
    }
    fn close(&mut self) -> Result<(), StimError> {
        let mut state = self.log.lock();
        if state.closed {
            return Err(StimError::Transport(format!("{} already closed", self.label)));
        }
        state.closed = true;
        Ok(())
    }
    fn describe(&self) -> String {
        format!("memory:{}", self.label)
    }
}
