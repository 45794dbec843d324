// src/drivers/opcode.rs
use std::fmt;

/// Single-byte command identifiers understood by the stimulator firmware.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Wake = 0xFF,
    Blink = 0x63,
    DisplayOff = 0x44,
    DisplayOn = 0x45,
    ResetCounter = 0x4E,
    StartStimulation = 0x50,
    EmergencyStop = 0x21,
    Bipolar = 0x62,
    Monopolar = 0x61,
    TriggerMode = 0x5A,
    PulseCount = 0x59,
    OutputVoltage = 0x53,
    PulseDelayMs = 0x58,
    PulseDelayUs = 0x3A,
    PulseWidthMs = 0x57,
    PulseWidthUs = 0x39,
}

impl Opcode {
    pub const ALL: [Opcode; 16] = [
        Opcode::Wake,
        Opcode::Blink,
        Opcode::DisplayOff,
        Opcode::DisplayOn,
        Opcode::ResetCounter,
        Opcode::StartStimulation,
        Opcode::EmergencyStop,
        Opcode::Bipolar,
        Opcode::Monopolar,
        Opcode::TriggerMode,
        Opcode::PulseCount,
        Opcode::OutputVoltage,
        Opcode::PulseDelayMs,
        Opcode::PulseDelayUs,
        Opcode::PulseWidthMs,
        Opcode::PulseWidthUs,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.byte() == byte)
    }

    /// Number of payload bytes that follow the opcode on the wire.
    pub fn payload_len(self) -> usize {
        match self {
            Opcode::DisplayOff | Opcode::DisplayOn | Opcode::TriggerMode => 1,
            Opcode::PulseCount
            | Opcode::OutputVoltage
            | Opcode::PulseDelayMs
            | Opcode::PulseDelayUs
            | Opcode::PulseWidthMs
            | Opcode::PulseWidthUs => 2,
            _ => 0,
        }
    }

    /// Delay and width commands are dropped when they encode to zero.
    pub fn suppress_zero(self) -> bool {
        matches!(
            self,
            Opcode::PulseDelayMs
                | Opcode::PulseDelayUs
                | Opcode::PulseWidthMs
                | Opcode::PulseWidthUs
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Wake => "wake",
            Opcode::Blink => "blink",
            Opcode::DisplayOff => "display off",
            Opcode::DisplayOn => "display on",
            Opcode::ResetCounter => "reset counter",
            Opcode::StartStimulation => "start",
            Opcode::EmergencyStop => "stop",
            Opcode::Bipolar => "bipolar",
            Opcode::Monopolar => "monopolar",
            Opcode::TriggerMode => "trigger mode",
            Opcode::PulseCount => "pulse count",
            Opcode::OutputVoltage => "output voltage",
            Opcode::PulseDelayMs => "pulse delay (ms)",
            Opcode::PulseDelayUs => "pulse delay (us)",
            Opcode::PulseWidthMs => "pulse width (ms)",
            Opcode::PulseWidthUs => "pulse width (us)",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.byte())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_match_firmware_table() {
        let table = [
            (Opcode::Wake, 0xFF),
            (Opcode::Blink, 0x63),
            (Opcode::DisplayOff, 0x44),
            (Opcode::DisplayOn, 0x45),
            (Opcode::ResetCounter, 0x4E),
            (Opcode::StartStimulation, 0x50),
            (Opcode::EmergencyStop, 0x21),
            (Opcode::Bipolar, 0x62),
            (Opcode::Monopolar, 0x61),
            (Opcode::TriggerMode, 0x5A),
            (Opcode::PulseCount, 0x59),
            (Opcode::OutputVoltage, 0x53),
            (Opcode::PulseDelayMs, 0x58),
            (Opcode::PulseDelayUs, 0x3A),
            (Opcode::PulseWidthMs, 0x57),
            (Opcode::PulseWidthUs, 0x39),
        ];
        for (op, byte) in table {
            assert_eq!(op.byte(), byte, "{op}");
            assert_eq!(Opcode::from_byte(byte), Some(op));
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert_eq!(Opcode::from_byte(0x41), None);
    }

    #[test]
    fn only_delay_and_width_are_suppressible() {
        let suppressible: Vec<_> = Opcode::ALL
            .into_iter()
            .filter(|op| op.suppress_zero())
            .collect();
        assert_eq!(
            suppressible,
            vec![
                Opcode::PulseDelayMs,
                Opcode::PulseDelayUs,
                Opcode::PulseWidthMs,
                Opcode::PulseWidthUs
            ]
        );
    }
}
