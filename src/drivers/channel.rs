use std::fmt;
use std::thread;
use std::time::Duration;
use log::{debug, info, warn};
use crate::drivers::encoder::{Command, Parameter, Polarity};
use crate::drivers::error::StimError;
use crate::drivers::params::StimParameters;
use crate::drivers::transport::{SerialSettings, SerialTransport, Transport, TransportCapabilities};
/// Pause between opening a port and the wake byte; the board resets on connect.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Dac1,
    Dac2,
}
impl ChannelId {
    pub const BOTH: [ChannelId; 2] = [ChannelId::Dac1, ChannelId::Dac2];
    pub fn number(self) -> u8 {
        match self {
            ChannelId::Dac1 => 1,
            ChannelId::Dac2 => 2,
        }
    }
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(ChannelId::Dac1),
            2 => Some(ChannelId::Dac2),
            _ => None,
        }
    }
}
impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DAC{}", self.number())
    }
}
/// Controller for one stimulator. Owns its transport until `close`.
pub struct Channel {
    id: ChannelId,
    transport: Option<Box<dyn Transport>>,
    settle_delay: Duration,
}
impl Channel {
    pub fn new(id: ChannelId, transport: Box<dyn Transport>) -> Self {
        Self {
            id,
            transport: Some(transport),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
    /// Opens the serial port. No bytes are sent; call `wake` next.
    pub fn open(id: ChannelId, settings: &SerialSettings) -> Result<Self, StimError> {
        let transport = SerialTransport::open(settings)?;
        info!("{id}: opened {}", settings.path);
        Ok(Self::new(id, Box::new(transport)))
    }
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
    pub fn id(&self) -> ChannelId {
        self.id
    }
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }
    pub fn capabilities(&self) -> Result<TransportCapabilities, StimError> {
        Ok(self.transport()?.capabilities())
    }
    fn transport(&self) -> Result<&dyn Transport, StimError> {
        self.transport.as_deref().ok_or(closed_error(self.id))
    }
    /// Waits for the board to settle, then sends the wake byte.
    pub fn wake(&mut self) -> Result<(), StimError> {
        self.transport()?;
        if !self.settle_delay.is_zero() {
            debug!("{}: settling for {:?}", self.id, self.settle_delay);
            thread::sleep(self.settle_delay);
        }
        self.send(&Command::wake())?;
        info!("{}: woke device", self.id);
        Ok(())
    }
    /// Writes the opcode and each payload byte as separate, ordered writes.
    pub fn send(&mut self, command: &Command) -> Result<(), StimError> {
        let id = self.id;
        let transport = self.transport.as_mut().ok_or(closed_error(id))?;
        debug!("{id} <- {command}");
        for byte in command.bytes() {
            transport.write(&[byte])?;
        }
        Ok(())
    }
    /// Releases the transport. A second close is a usage error.
    pub fn close(&mut self) -> Result<(), StimError> {
        let mut transport = self.transport.take().ok_or(closed_error(self.id))?;
        info!("{}: closing {}", self.id, transport.describe());
        transport.close()
    }
    pub fn blink(&mut self) -> Result<(), StimError> {
        self.send(&Command::blink())
    }
    pub fn set_display(&mut self, on: bool) -> Result<(), StimError> {
        self.send(&Command::display(on))
    }
    pub fn reset_counter(&mut self) -> Result<(), StimError> {
        self.send(&Command::reset_counter())
    }
    pub fn start(&mut self) -> Result<(), StimError> {
        self.send(&Command::start())
    }
    pub fn stop(&mut self) -> Result<(), StimError> {
        self.send(&Command::stop())
    }
    pub fn set_polarity(&mut self, polarity: Polarity) -> Result<(), StimError> {
        self.send(&Command::polarity(polarity))
    }
    pub fn set_trigger_mode(&mut self, mode: u8) -> Result<(), StimError> {
        self.send(&Command::trigger_mode(mode))
    }
    /// Encodes and sends one two-byte parameter. Returns `false` when the
    /// value encodes to zero and the command is suppressed.
    pub fn set_parameter(&mut self, parameter: Parameter, value: f64) -> Result<bool, StimError> {
        self.transport()?;
        match parameter.encode(value)? {
            Some(command) => {
                self.send(&command)?;
                Ok(true)
            }
            None => {
                warn!("{}: {} is zero, not sent", self.id, parameter.name());
                Ok(false)
            }
        }
    }
    pub fn set_pulse_count(&mut self, count: u16) -> Result<bool, StimError> {
        self.set_parameter(Parameter::PulseCount, f64::from(count))
    }
    pub fn set_output_voltage(&mut self, millivolts: f64) -> Result<bool, StimError> {
        self.set_parameter(Parameter::OutputVoltage, millivolts)
    }
    pub fn set_pulse_delay_ms(&mut self, ms: f64) -> Result<bool, StimError> {
        self.set_parameter(Parameter::PulseDelayMs, ms)
    }
    pub fn set_pulse_delay_us(&mut self, us: u16) -> Result<bool, StimError> {
        self.set_parameter(Parameter::PulseDelayUs, f64::from(us))
    }
    pub fn set_pulse_width_ms(&mut self, ms: f64) -> Result<bool, StimError> {
        self.set_parameter(Parameter::PulseWidthMs, ms)
    }
    pub fn set_pulse_width_us(&mut self, us: u16) -> Result<bool, StimError> {
        self.set_parameter(Parameter::PulseWidthUs, f64::from(us))
    }
    /// Sends a full parameter set in panel order: trigger, pulses, delay (ms,
    /// us), width (ms, us), voltage. Stops at the first failing write.
    pub fn apply(&mut self, params: &StimParameters) -> Result<(), StimError> {
        params.validate()?;
        self.transport()?;
        self.set_trigger_mode(params.trigger_mode)?;
        self.set_pulse_count(params.pulse_count)?;
        self.set_pulse_delay_ms(params.pulse_delay_ms)?;
        self.set_pulse_delay_us(params.pulse_delay_us)?;
        self.set_pulse_width_ms(params.pulse_width_ms)?;
        self.set_pulse_width_us(params.pulse_width_us)?;
        self.set_output_voltage(params.output_voltage_mv)?;
        Ok(())
    }
}
/// Opens a channel's port and wakes the device, the way the panel starts up.
pub fn open_channel(
    id: ChannelId,
    settings: &SerialSettings,
    settle_delay: Duration,
) -> Result<Channel, StimError> {
    let mut channel = Channel::open(id, settings)?.with_settle_delay(settle_delay);
    channel.wake()?;
    Ok(channel)
}
fn closed_error(channel: ChannelId) -> StimError {
    StimError::Usage {
        channel,
        reason: "channel is closed",
    }
}
impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.close();
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::opcode::Opcode;
    use crate::drivers::params::ChannelInputs;
    use crate::drivers::transport::{MemoryTransport, WireLog};
    fn memory_channel(id: ChannelId) -> (Channel, WireLog) {
        let (transport, log) = MemoryTransport::new(id.to_string());
        let channel = Channel::new(id, Box::new(transport)).with_settle_delay(Duration::ZERO);
        (channel, log)
    }
    #[test]
    fn wake_sends_single_ff() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        ch.wake().unwrap();
        assert_eq!(log.bytes(), vec![0xFF]);
    }
    #[test]
    fn payload_bytes_are_written_separately() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        ch.set_pulse_count(300).unwrap();
        assert_eq!(log.writes(), vec![vec![0x59], vec![0x01], vec![0x2C]]);
    }
    #[test]
    fn start_emits_exactly_0x50() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        ch.start().unwrap();
        assert_eq!(log.bytes(), vec![0x50]);
    }
    #[test]
    fn trigger_mode_on_dac2() {
        let (mut ch, log) = memory_channel(ChannelId::Dac2);
        ch.set_trigger_mode(2).unwrap();
        assert_eq!(log.bytes(), vec![0x5A, 0x02]);
    }
    #[test]
    fn zero_delay_is_not_sent_but_zero_voltage_is() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        assert!(!ch.set_pulse_delay_ms(0.0).unwrap());
        assert!(!ch.set_pulse_width_us(0).unwrap());
        assert!(log.bytes().is_empty());
        assert!(ch.set_output_voltage(0.0).unwrap());
        assert!(ch.set_pulse_count(0).unwrap());
        assert_eq!(log.bytes(), vec![0x53, 0x00, 0x00, 0x59, 0x00, 0x00]);
    }
    #[test]
    fn write_after_close_is_usage_error() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        ch.close().unwrap();
        assert!(log.is_closed());
        assert!(!ch.is_open());
        assert!(matches!(
            ch.start(),
            Err(StimError::Usage { channel: ChannelId::Dac1, .. })
        ));
        assert!(matches!(ch.set_pulse_delay_ms(0.0), Err(StimError::Usage { .. })));
        assert!(matches!(ch.wake(), Err(StimError::Usage { .. })));
        assert!(log.bytes().is_empty());
    }
    #[test]
    fn double_close_is_usage_error() {
        let (mut ch, _log) = memory_channel(ChannelId::Dac2);
        ch.close().unwrap();
        assert!(matches!(ch.close(), Err(StimError::Usage { .. })));
    }
    #[test]
    fn encode_error_sends_nothing() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        assert!(matches!(
            ch.set_output_voltage(1.0e6),
            Err(StimError::Range { .. })
        ));
        assert!(log.bytes().is_empty());
    }
    #[test]
    fn apply_follows_panel_order() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        let params = ChannelInputs::default().parse().unwrap();
        ch.apply(&params).unwrap();
        // delay us and width ms default to zero and are suppressed
        assert_eq!(
            log.bytes(),
            vec![0x5A, 0x00, 0x59, 0x00, 0x1E, 0x58, 0x00, 0xAA, 0x39, 0x00, 0x64, 0x53, 0x00, 0x00]
        );
        let opcodes: Vec<Opcode> = log.commands().iter().map(Command::opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::TriggerMode,
                Opcode::PulseCount,
                Opcode::PulseDelayMs,
                Opcode::PulseWidthUs,
                Opcode::OutputVoltage,
            ]
        );
    }
    #[test]
    fn transport_failure_surfaces() {
        let (mut ch, log) = memory_channel(ChannelId::Dac1);
        log.set_failing(true);
        assert!(matches!(ch.stop(), Err(StimError::Transport(_))));
        assert!(ch.is_open());
    }
    #[test]
    fn memory_transport_is_unacknowledged() {
        let (ch, _log) = memory_channel(ChannelId::Dac1);
        assert!(!ch.capabilities().unwrap().acknowledged);
    }
    #[test]
    fn open_channel_on_missing_port_is_transport_error() {
        let settings = SerialSettings::new("/dev/stimpanel-missing");
        assert!(matches!(
            open_channel(ChannelId::Dac1, &settings, Duration::ZERO),
            Err(StimError::Transport(_))
        ));
    }
    #[test]
    fn drop_releases_open_transport() {
        let (ch, log) = memory_channel(ChannelId::Dac1);
        drop(ch);
        assert!(log.is_closed());
    }
}
