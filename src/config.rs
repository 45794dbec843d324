// src/config.rs
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::drivers::{
    ChannelId, ChannelInputs, SerialSettings, DEFAULT_BAUD_RATE, DEFAULT_SETTLE_DELAY,
};

/// Panel settings, read from a JSON file. Missing keys fall back to defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub dac1_port: String,
    pub dac2_port: String,
    pub baud_rate: u32,
    pub write_timeout_ms: u64,
    pub settle_delay_ms: u64,
    /// Use in-memory transports instead of serial ports.
    pub dry_run: bool,
    pub dac1_inputs: ChannelInputs,
    pub dac2_inputs: ChannelInputs,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            dac1_port: "/dev/ttyACM0".to_owned(),
            dac2_port: "/dev/ttyACM1".to_owned(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout_ms: 0,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            dry_run: false,
            dac1_inputs: ChannelInputs::default(),
            dac2_inputs: ChannelInputs::default(),
        }
    }
}

impl PanelConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid panel config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn port(&self, id: ChannelId) -> &str {
        match id {
            ChannelId::Dac1 => &self.dac1_port,
            ChannelId::Dac2 => &self.dac2_port,
        }
    }

    pub fn serial_settings(&self, id: ChannelId) -> SerialSettings {
        SerialSettings {
            path: self.port(id).to_owned(),
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn inputs(&self, id: ChannelId) -> &ChannelInputs {
        match id {
            ChannelId::Dac1 => &self.dac1_inputs,
            ChannelId::Dac2 => &self.dac2_inputs,
        }
    }
}
