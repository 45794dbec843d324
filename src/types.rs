// src/types.rs
use std::fmt;
use std::str::FromStr;

use crate::drivers::{ChannelId, ChannelSelection, InputField, Polarity, StimError};

// Actions the operator shell sends to the engine
#[derive(Clone, Debug, PartialEq)]
pub enum PanelAction {
    Blink,
    Display(bool),
    ResetCounter,
    Start(ChannelSelection),
    Stop,
    SetPolarity(Polarity),
    // "Set DAC1" / "Set DAC2" / "Set DAC1 & DAC2"
    Apply(ChannelSelection),
    SetInput {
        channel: ChannelId,
        field: InputField,
        value: String,
    },
    Show,
    Close,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  blink                         blink both boards
  display on|off                switch both displays
  reset                         reset pulse counters
  start 1|2|both                start stimulation
  stop                          emergency stop on both channels
  bipolar | monopolar           electrode mode on both channels
  set 1|2|both                  send the entered parameters
  input 1|2 <field> <value>     edit a parameter field
      fields: trigger pulses delay_ms delay_us width_ms width_us voltage
  show                          print entered parameters
  close                         close both ports
  quit";

impl FromStr for PanelAction {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let action = match words.as_slice() {
            ["blink"] => PanelAction::Blink,
            ["display", "on"] => PanelAction::Display(true),
            ["display", "off"] => PanelAction::Display(false),
            ["reset"] => PanelAction::ResetCounter,
            ["start", target] => PanelAction::Start(target.parse()?),
            ["stop"] => PanelAction::Stop,
            ["bipolar"] => PanelAction::SetPolarity(Polarity::Bipolar),
            ["monopolar"] => PanelAction::SetPolarity(Polarity::Monopolar),
            ["set", target] => PanelAction::Apply(target.parse()?),
            ["input", channel, field, value] => {
                let channel = channel
                    .parse::<u8>()
                    .ok()
                    .and_then(ChannelId::from_number)
                    .ok_or_else(|| format!("unknown channel '{channel}' (expected 1 or 2)"))?;
                let field = InputField::from_key(field)
                    .ok_or_else(|| format!("unknown field '{field}'"))?;
                PanelAction::SetInput {
                    channel,
                    field,
                    value: (*value).to_owned(),
                }
            }
            ["show"] => PanelAction::Show,
            ["close"] => PanelAction::Close,
            ["help"] | ["?"] => PanelAction::Help,
            ["quit"] | ["exit"] => PanelAction::Quit,
            [] => return Err("empty command".to_owned()),
            _ => return Err(format!("unrecognised command '{}'", line.trim())),
        };
        Ok(action)
    }
}

// What the engine reports back to the shell
#[derive(Debug)]
pub enum PanelMessage {
    Log(String),
    ChannelResult {
        channel: ChannelId,
        result: Result<(), StimError>,
    },
    Quit,
}

impl fmt::Display for PanelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelMessage::Log(text) => write!(f, "{text}"),
            PanelMessage::ChannelResult { channel, result: Ok(()) } => write!(f, "{channel}: ok"),
            PanelMessage::ChannelResult { channel, result: Err(e) } => {
                write!(f, "{channel}: error: {e}")
            }
            PanelMessage::Quit => write!(f, "bye"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_action() {
        let cases = [
            ("blink", PanelAction::Blink),
            ("display on", PanelAction::Display(true)),
            ("display off", PanelAction::Display(false)),
            ("reset", PanelAction::ResetCounter),
            ("start both", PanelAction::Start(ChannelSelection::Both)),
            ("start 2", PanelAction::Start(ChannelSelection::Dac2)),
            ("stop", PanelAction::Stop),
            ("bipolar", PanelAction::SetPolarity(Polarity::Bipolar)),
            ("monopolar", PanelAction::SetPolarity(Polarity::Monopolar)),
            ("set 1", PanelAction::Apply(ChannelSelection::Dac1)),
            ("  show ", PanelAction::Show),
            ("close", PanelAction::Close),
            ("quit", PanelAction::Quit),
        ];
        for (line, expected) in cases {
            assert_eq!(line.parse::<PanelAction>().unwrap(), expected, "{line}");
        }
    }

    #[test]
    fn parses_input_edit() {
        let action: PanelAction = "input 2 width_us 250".parse().unwrap();
        assert_eq!(
            action,
            PanelAction::SetInput {
                channel: ChannelId::Dac2,
                field: InputField::PulseWidthUs,
                value: "250".to_owned(),
            }
        );
    }

    #[test]
    fn rejects_bad_lines() {
        for line in ["", "start", "start 3", "input 3 pulses 10", "input 1 speed 10", "launch"] {
            assert!(line.parse::<PanelAction>().is_err(), "{line}");
        }
    }
}
