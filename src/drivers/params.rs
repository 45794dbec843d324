// src/drivers/params.rs
use serde::{Deserialize, Serialize};
use crate::drivers::encoder::Parameter;
use crate::drivers::error::StimError;

pub const TRIGGER_MODE_MAX: u8 = 3;
pub const PULSE_COUNT_MIN: u16 = 1;
pub const PULSE_COUNT_MAX: u16 = 9999;

/// One editable text field of a channel's parameter form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputField {
    TriggerMode,
    PulseCount,
    PulseDelayMs,
    PulseDelayUs,
    PulseWidthMs,
    PulseWidthUs,
    OutputVoltage,
}

impl InputField {
    /// Order in which a full parameter set is transmitted.
    pub const ALL: [InputField; 7] = [
        InputField::TriggerMode,
        InputField::PulseCount,
        InputField::PulseDelayMs,
        InputField::PulseDelayUs,
        InputField::PulseWidthMs,
        InputField::PulseWidthUs,
        InputField::OutputVoltage,
    ];

    pub fn key(self) -> &'static str {
        match self {
            InputField::TriggerMode => "trigger",
            InputField::PulseCount => "pulses",
            InputField::PulseDelayMs => "delay_ms",
            InputField::PulseDelayUs => "delay_us",
            InputField::PulseWidthMs => "width_ms",
            InputField::PulseWidthUs => "width_us",
            InputField::OutputVoltage => "voltage",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            InputField::TriggerMode => "Trigger Number",
            InputField::PulseCount => "Number of Pulses (1-9999)",
            InputField::PulseDelayMs => "Pulse Delay (ms)",
            InputField::PulseDelayUs => "Pulse Delay (us)",
            InputField::PulseWidthMs => "Pulse Width (ms)",
            InputField::PulseWidthUs => "Pulse Width (us)",
            InputField::OutputVoltage => "Output Voltage (mV)",
        }
    }
}

/// Raw text entered for one channel, exactly as the operator typed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelInputs {
    pub trigger_mode: String,
    pub pulse_count: String,
    pub pulse_delay_ms: String,
    pub pulse_delay_us: String,
    pub pulse_width_ms: String,
    pub pulse_width_us: String,
    pub output_voltage: String,
}

impl Default for ChannelInputs {
    fn default() -> Self {
        Self {
            trigger_mode: "0".to_owned(),
            pulse_count: "30".to_owned(),
            pulse_delay_ms: "17".to_owned(),
            pulse_delay_us: "0".to_owned(),
            pulse_width_ms: "0".to_owned(),
            pulse_width_us: "100".to_owned(),
            output_voltage: "0".to_owned(),
        }
    }
}

impl ChannelInputs {
    pub fn get(&self, field: InputField) -> &str {
        match field {
            InputField::TriggerMode => &self.trigger_mode,
            InputField::PulseCount => &self.pulse_count,
            InputField::PulseDelayMs => &self.pulse_delay_ms,
            InputField::PulseDelayUs => &self.pulse_delay_us,
            InputField::PulseWidthMs => &self.pulse_width_ms,
            InputField::PulseWidthUs => &self.pulse_width_us,
            InputField::OutputVoltage => &self.output_voltage,
        }
    }

    pub fn set(&mut self, field: InputField, text: impl Into<String>) {
        let slot = match field {
            InputField::TriggerMode => &mut self.trigger_mode,
            InputField::PulseCount => &mut self.pulse_count,
            InputField::PulseDelayMs => &mut self.pulse_delay_ms,
            InputField::PulseDelayUs => &mut self.pulse_delay_us,
            InputField::PulseWidthMs => &mut self.pulse_width_ms,
            InputField::PulseWidthUs => &mut self.pulse_width_us,
            InputField::OutputVoltage => &mut self.output_voltage,
        };
        *slot = text.into();
    }

    /// Parses and range-checks every field. Nothing is sent if any field fails.
    pub fn parse(&self) -> Result<StimParameters, StimError> {
        let trigger_mode = parse_integer(InputField::TriggerMode, &self.trigger_mode)?;
        let trigger_mode =
            in_range(InputField::TriggerMode, trigger_mode, 0, i64::from(TRIGGER_MODE_MAX))?;
        let pulse_count = parse_integer(InputField::PulseCount, &self.pulse_count)?;
        let pulse_count = in_range(
            InputField::PulseCount,
            pulse_count,
            i64::from(PULSE_COUNT_MIN),
            i64::from(PULSE_COUNT_MAX),
        )?;
        let params = StimParameters {
            trigger_mode: trigger_mode as u8,
            pulse_count: pulse_count as u16,
            pulse_delay_ms: parse_decimal(InputField::PulseDelayMs, &self.pulse_delay_ms)?,
            pulse_delay_us: parse_micros(InputField::PulseDelayUs, &self.pulse_delay_us)?,
            pulse_width_ms: parse_decimal(InputField::PulseWidthMs, &self.pulse_width_ms)?,
            pulse_width_us: parse_micros(InputField::PulseWidthUs, &self.pulse_width_us)?,
            output_voltage_mv: parse_decimal(InputField::OutputVoltage, &self.output_voltage)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Typed parameter set for one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StimParameters {
    pub trigger_mode: u8,
    pub pulse_count: u16,
    pub pulse_delay_ms: f64,
    pub pulse_delay_us: u16,
    pub pulse_width_ms: f64,
    pub pulse_width_us: u16,
    pub output_voltage_mv: f64,
}

impl StimParameters {
    /// Checks that every two-byte value fits its encoding.
    pub fn validate(&self) -> Result<(), StimError> {
        for (parameter, value) in self.two_byte_values() {
            parameter.split(value)?;
        }
        Ok(())
    }

    pub fn two_byte_values(&self) -> [(Parameter, f64); 6] {
        [
            (Parameter::PulseCount, f64::from(self.pulse_count)),
            (Parameter::PulseDelayMs, self.pulse_delay_ms),
            (Parameter::PulseDelayUs, f64::from(self.pulse_delay_us)),
            (Parameter::PulseWidthMs, self.pulse_width_ms),
            (Parameter::PulseWidthUs, f64::from(self.pulse_width_us)),
            (Parameter::OutputVoltage, self.output_voltage_mv),
        ]
    }
}

fn parse_error(field: InputField, text: &str) -> StimError {
    StimError::Parse {
        field: field.label(),
        input: text.to_owned(),
    }
}

fn parse_integer(field: InputField, text: &str) -> Result<i64, StimError> {
    text.trim().parse::<i64>().map_err(|_| parse_error(field, text))
}

fn in_range(field: InputField, value: i64, min: i64, max: i64) -> Result<i64, StimError> {
    if value < min || value > max {
        return Err(StimError::Range {
            parameter: field.label(),
            value: value as f64,
            reason: "outside the accepted range",
        });
    }
    Ok(value)
}

fn parse_micros(field: InputField, text: &str) -> Result<u16, StimError> {
    let value = parse_integer(field, text)?;
    Ok(in_range(field, value, 0, i64::from(u16::MAX))? as u16)
}

fn parse_decimal(field: InputField, text: &str) -> Result<f64, StimError> {
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|_| parse_error(field, text))?;
    if !value.is_finite() {
        return Err(parse_error(field, text));
    }
    if value < 0.0 {
        return Err(StimError::Range {
            parameter: field.label(),
            value,
            reason: "must not be negative",
        });
    }
    Ok(value)
}
