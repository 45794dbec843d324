use thiserror::Error;
use crate::drivers::channel::ChannelId;
#[derive(Debug, Error)]
pub enum StimError {
    #[error("{field}: '{input}' is not a valid number")]
    Parse { field: &'static str, input: String },
    #[error("{parameter}: {value} is out of range ({reason})")]
    Range {
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("{channel}: {reason}")]
    Usage {
        channel: ChannelId,
        reason: &'static str,
    },
}
impl From<std::io::Error> for StimError {
    fn from(value: std::io::Error) -> Self {
        StimError::Transport(value.to_string())
    }
}
impl From<serialport::Error> for StimError {
    fn from(value: serialport::Error) -> Self {
        StimError::Transport(value.to_string())
    }
}
impl StimError {
    /// True for errors raised before any byte left the process.
    pub fn is_input_error(&self) -> bool {
        matches!(self, StimError::Parse { .. } | StimError::Range { .. })
    }
}
