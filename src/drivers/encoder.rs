//! Conversion of physical stimulation quantities into device commands.
//!
//! Every two-byte parameter is split into a coarse high byte and a fine low byte:
//! - `high = floor(value / divisor)`
//! - `low = (value mod divisor) / step`, either floored or rounded per parameter.
//!
//! The split is done on the total count of fine steps, so a remainder that
//! rounds up to a whole coarse unit carries into the high byte.
//!
//! Voltage, pulse count and microsecond width keep the integer remainder
//! (floor). Millisecond delay/width and microsecond delay round to the nearest
//! fine step. The high byte always precedes the low byte on the wire.
use std::fmt;
use crate::drivers::error::StimError;
use crate::drivers::opcode::Opcode;
/// How the fine remainder becomes the low byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LowByteRule {
    Floor,
    Round,
}
/// Coarse/fine scaling for a two-byte parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    pub divisor: f64,
    pub step: f64,
    pub rule: LowByteRule,
}
impl Scale {
    /// Fine steps per coarse unit; 256 for every parameter the device knows.
    fn steps_per_unit(&self) -> f64 {
        (self.divisor / self.step).round()
    }
}
/// Two-byte stimulation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parameter {
    PulseCount,
    OutputVoltage,
    PulseDelayMs,
    PulseDelayUs,
    PulseWidthMs,
    PulseWidthUs,
}
impl Parameter {
    pub const ALL: [Parameter; 6] = [
        Parameter::PulseCount,
        Parameter::OutputVoltage,
        Parameter::PulseDelayMs,
        Parameter::PulseDelayUs,
        Parameter::PulseWidthMs,
        Parameter::PulseWidthUs,
    ];
    pub fn opcode(self) -> Opcode {
        match self {
            Parameter::PulseCount => Opcode::PulseCount,
            Parameter::OutputVoltage => Opcode::OutputVoltage,
            Parameter::PulseDelayMs => Opcode::PulseDelayMs,
            Parameter::PulseDelayUs => Opcode::PulseDelayUs,
            Parameter::PulseWidthMs => Opcode::PulseWidthMs,
            Parameter::PulseWidthUs => Opcode::PulseWidthUs,
        }
    }
    pub fn scale(self) -> Scale {
        match self {
            Parameter::PulseCount => Scale {
                divisor: 256.0,
                step: 1.0,
                rule: LowByteRule::Floor,
            },
            Parameter::OutputVoltage => Scale {
                divisor: 128.0,
                step: 0.5,
                rule: LowByteRule::Floor,
            },
            Parameter::PulseDelayMs => Scale {
                divisor: 25.6,
                step: 0.1,
                rule: LowByteRule::Round,
            },
            Parameter::PulseDelayUs => Scale {
                divisor: 256.0,
                step: 1.0,
                rule: LowByteRule::Round,
            },
            Parameter::PulseWidthMs => Scale {
                divisor: 25.6,
                step: 0.1,
                rule: LowByteRule::Round,
            },
            Parameter::PulseWidthUs => Scale {
                divisor: 256.0,
                step: 1.0,
                rule: LowByteRule::Floor,
            },
        }
    }
    pub fn name(self) -> &'static str {
        self.opcode().name()
    }
    /// Splits `value` into `(high, low)` bytes.
    pub fn split(self, value: f64) -> Result<(u8, u8), StimError> {
        if !value.is_finite() {
            return Err(self.range_error(value, "not a finite number"));
        }
        if value < 0.0 {
            return Err(self.range_error(value, "must not be negative"));
        }
        let scale = self.scale();
        // count whole fine steps first so high and low always agree
        let fine = value / scale.step;
        let total = match scale.rule {
            LowByteRule::Floor => fine.floor(),
            LowByteRule::Round => fine.round(),
        };
        let steps = scale.steps_per_unit();
        if total >= steps * 256.0 {
            return Err(self.range_error(value, "high byte exceeds 255"));
        }
        let (total, steps) = (total as u32, steps as u32);
        Ok(((total / steps) as u8, (total % steps) as u8))
    }
    /// Reconstructs the value the device will apply for a byte pair.
    pub fn join(self, high: u8, low: u8) -> f64 {
        let scale = self.scale();
        f64::from(high) * scale.divisor + f64::from(low) * scale.step
    }
    /// Largest value that still fits the two-byte encoding.
    pub fn max_value(self) -> f64 {
        self.join(u8::MAX, u8::MAX)
    }
    /// Builds the command for `value`, or `None` when the zero-suppression rule drops it.
    pub fn encode(self, value: f64) -> Result<Option<Command>, StimError> {
        let (high, low) = self.split(value)?;
        let opcode = self.opcode();
        if opcode.suppress_zero() && high == 0 && low == 0 {
            return Ok(None);
        }
        Ok(Some(Command::new(opcode, Payload::Word { high, low })))
    }
    fn range_error(self, value: f64, reason: &'static str) -> StimError {
        StimError::Range {
            parameter: self.name(),
            value,
            reason,
        }
    }
}
/// Electrode configuration (both modes keep the op-amp enabled).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    Bipolar,
    Monopolar,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    None,
    Byte(u8),
    Word { high: u8, low: u8 },
}
impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::None => 0,
            Payload::Byte(_) => 1,
            Payload::Word { .. } => 2,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
/// One opcode plus its payload, addressed to a single channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    payload: Payload,
}
impl Command {
    fn new(opcode: Opcode, payload: Payload) -> Self {
        Self { opcode, payload }
    }
    pub fn wake() -> Self {
        Self::new(Opcode::Wake, Payload::None)
    }
    pub fn blink() -> Self {
        Self::new(Opcode::Blink, Payload::None)
    }
    pub fn display(on: bool) -> Self {
        if on {
            Self::new(Opcode::DisplayOn, Payload::Byte(0x01))
        } else {
            Self::new(Opcode::DisplayOff, Payload::Byte(0x00))
        }
    }
    pub fn reset_counter() -> Self {
        Self::new(Opcode::ResetCounter, Payload::None)
    }
    pub fn start() -> Self {
        Self::new(Opcode::StartStimulation, Payload::None)
    }
    pub fn stop() -> Self {
        Self::new(Opcode::EmergencyStop, Payload::None)
    }
    pub fn polarity(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Bipolar => Self::new(Opcode::Bipolar, Payload::None),
            Polarity::Monopolar => Self::new(Opcode::Monopolar, Payload::None),
        }
    }
    /// Raw trigger index; the firmware accepts 0-3 and the encoder does not check it.
    pub fn trigger_mode(mode: u8) -> Self {
        Self::new(Opcode::TriggerMode, Payload::Byte(mode))
    }
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }
    pub fn payload(&self) -> Payload {
        self.payload
    }
    /// Opcode byte plus payload bytes.
    pub fn wire_len(&self) -> usize {
        1 + self.payload.len()
    }
    /// Wire bytes in transmission order.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.push(self.opcode.byte());
        match self.payload {
            Payload::None => {}
            Payload::Byte(b) => out.push(b),
            Payload::Word { high, low } => {
                out.push(high);
                out.push(low);
            }
        }
        out
    }
    /// Splits a recorded byte stream back into commands. Stops at the first
    /// unknown opcode or truncated payload.
    pub fn decode_stream(bytes: &[u8]) -> Vec<Command> {
        let mut commands = Vec::new();
        let mut rest = bytes;
        while let Some((&first, tail)) = rest.split_first() {
            let Some(opcode) = Opcode::from_byte(first) else {
                break;
            };
            let needed = opcode.payload_len();
            if tail.len() < needed {
                break;
            }
            let payload = match needed {
                0 => Payload::None,
                1 => Payload::Byte(tail[0]),
                _ => Payload::Word {
                    high: tail[0],
                    low: tail[1],
                },
            };
            commands.push(Command::new(opcode, payload));
            rest = &tail[needed..];
        }
        commands
    }
}
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.name())?;
        for byte in self.bytes() {
            write!(f, " {byte:02X}")?;
        }
        Ok(())
    }
}
