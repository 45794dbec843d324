// src/engine.rs
use anyhow::{Context, Result};
use log::info;

use crate::config::PanelConfig;
use crate::drivers::{
    open_channel, Channel, ChannelId, ChannelInputs, ChannelSelection, Coordinator, DispatchReport,
    InputField, MemoryTransport, WireLog,
};
use crate::types::{PanelAction, PanelMessage, HELP};

/// Executes operator actions against both stimulators, one at a time, on the
/// caller's thread. Holds the text last entered for each channel.
pub struct PanelEngine {
    coordinator: Coordinator,
    dac1_inputs: ChannelInputs,
    dac2_inputs: ChannelInputs,
    // only set in dry-run mode
    wire: Option<[WireLog; 2]>,
}

impl PanelEngine {
    pub fn new(
        coordinator: Coordinator,
        dac1_inputs: ChannelInputs,
        dac2_inputs: ChannelInputs,
    ) -> Self {
        Self {
            coordinator,
            dac1_inputs,
            dac2_inputs,
            wire: None,
        }
    }

    /// Opens and wakes DAC1, then DAC2, as configured.
    pub fn connect(config: &PanelConfig) -> Result<Self> {
        let mut wire = Vec::new();
        let mut channels = Vec::with_capacity(2);
        for id in ChannelId::BOTH {
            let channel = if config.dry_run {
                let (transport, log) = MemoryTransport::new(id.to_string());
                wire.push(log);
                let mut channel =
                    Channel::new(id, Box::new(transport)).with_settle_delay(config.settle_delay());
                channel
                    .wake()
                    .with_context(|| format!("failed to wake {id}"))?;
                channel
            } else {
                open_channel(id, &config.serial_settings(id), config.settle_delay())
                    .with_context(|| format!("failed to start {id} on {}", config.port(id)))?
            };
            channels.push(channel);
        }
        let dac2 = channels.pop().context("DAC2 missing")?;
        let dac1 = channels.pop().context("DAC1 missing")?;
        let mut engine = Self::new(
            Coordinator::new(dac1, dac2),
            config.dac1_inputs.clone(),
            config.dac2_inputs.clone(),
        );
        if let Ok([dac1_log, dac2_log]) = <[WireLog; 2]>::try_from(wire) {
            info!("dry run: no serial ports opened");
            engine.wire = Some([dac1_log, dac2_log]);
        }
        Ok(engine)
    }

    pub fn with_wire_logs(mut self, dac1: WireLog, dac2: WireLog) -> Self {
        self.wire = Some([dac1, dac2]);
        self
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn inputs(&self, id: ChannelId) -> &ChannelInputs {
        match id {
            ChannelId::Dac1 => &self.dac1_inputs,
            ChannelId::Dac2 => &self.dac2_inputs,
        }
    }

    fn inputs_mut(&mut self, id: ChannelId) -> &mut ChannelInputs {
        match id {
            ChannelId::Dac1 => &mut self.dac1_inputs,
            ChannelId::Dac2 => &mut self.dac2_inputs,
        }
    }

    pub fn handle(&mut self, action: PanelAction) -> Vec<PanelMessage> {
        let report = match action {
            PanelAction::Blink => self.coordinator.blink(),
            PanelAction::Display(on) => self.coordinator.set_display(on),
            PanelAction::ResetCounter => self.coordinator.reset_counter(),
            PanelAction::Start(selection) => self.coordinator.start(selection),
            PanelAction::Stop => self.coordinator.stop(),
            PanelAction::SetPolarity(polarity) => self.coordinator.set_polarity(polarity),
            PanelAction::Apply(selection) => self.apply(selection),
            PanelAction::Close => self.coordinator.close(),
            PanelAction::SetInput { channel, field, value } => {
                let text = format!("{channel} {} = {value}", field.label());
                self.inputs_mut(channel).set(field, value);
                return vec![PanelMessage::Log(text)];
            }
            PanelAction::Show => return self.show(),
            PanelAction::Help => return vec![PanelMessage::Log(HELP.to_owned())],
            PanelAction::Quit => return vec![PanelMessage::Quit],
        };
        self.report_messages(report)
    }

    fn apply(&mut self, selection: ChannelSelection) -> DispatchReport {
        info!("sending parameters to {selection}");
        let (dac1, dac2) = (&self.dac1_inputs, &self.dac2_inputs);
        self.coordinator.apply(selection, |id| match id {
            ChannelId::Dac1 => dac1.parse(),
            ChannelId::Dac2 => dac2.parse(),
        })
    }

    fn show(&self) -> Vec<PanelMessage> {
        let mut lines = Vec::new();
        for field in InputField::ALL {
            lines.push(PanelMessage::Log(format!(
                "{:<28} DAC1 {:>8}   DAC2 {:>8}",
                field.label(),
                self.dac1_inputs.get(field),
                self.dac2_inputs.get(field)
            )));
        }
        lines
    }

    fn report_messages(&self, report: DispatchReport) -> Vec<PanelMessage> {
        let mut messages = Vec::new();
        if let Some(wire) = &self.wire {
            for (id, log) in ChannelId::BOTH.into_iter().zip(wire) {
                let bytes = log.bytes();
                if !bytes.is_empty() {
                    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
                    messages.push(PanelMessage::Log(format!("{id} wire: {}", hex.join(" "))));
                }
                log.clear();
            }
        }
        messages.extend(report.outcomes.into_iter().map(|o| PanelMessage::ChannelResult {
            channel: o.channel,
            result: o.result,
        }));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::StimError;

    fn engine() -> (PanelEngine, WireLog, WireLog) {
        let (t1, log1) = MemoryTransport::new("dac1");
        let (t2, log2) = MemoryTransport::new("dac2");
        let coordinator = Coordinator::new(
            Channel::new(ChannelId::Dac1, Box::new(t1)),
            Channel::new(ChannelId::Dac2, Box::new(t2)),
        );
        let engine =
            PanelEngine::new(coordinator, ChannelInputs::default(), ChannelInputs::default());
        (engine, log1, log2)
    }

    fn results(messages: &[PanelMessage]) -> Vec<(ChannelId, bool)> {
        messages
            .iter()
            .filter_map(|m| match m {
                PanelMessage::ChannelResult { channel, result } => Some((*channel, result.is_ok())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_both_reports_each_channel() {
        let (mut e, log1, log2) = engine();
        let msgs = e.handle(PanelAction::Start(ChannelSelection::Both));
        assert_eq!(results(&msgs), vec![(ChannelId::Dac1, true), (ChannelId::Dac2, true)]);
        assert_eq!(log1.bytes(), vec![0x50]);
        assert_eq!(log2.bytes(), vec![0x50]);
    }

    #[test]
    fn edited_input_only_reaches_its_channel() {
        let (mut e, log1, log2) = engine();
        e.handle(PanelAction::SetInput {
            channel: ChannelId::Dac2,
            field: InputField::PulseWidthUs,
            value: "300".to_owned(),
        });
        assert_eq!(e.inputs(ChannelId::Dac1).pulse_width_us, "100");
        e.handle(PanelAction::Apply(ChannelSelection::Both));
        assert!(log1.bytes().windows(3).any(|w| w == [0x39, 0x00, 0x64]));
        assert!(log2.bytes().windows(3).any(|w| w == [0x39, 0x01, 0x2C]));
    }

    #[test]
    fn bad_input_fails_only_that_channel() {
        let (mut e, log1, log2) = engine();
        e.handle(PanelAction::SetInput {
            channel: ChannelId::Dac1,
            field: InputField::PulseCount,
            value: "lots".to_owned(),
        });
        let msgs = e.handle(PanelAction::Apply(ChannelSelection::Both));
        assert_eq!(results(&msgs), vec![(ChannelId::Dac1, false), (ChannelId::Dac2, true)]);
        assert!(log1.bytes().is_empty());
        assert!(!log2.bytes().is_empty());
    }

    #[test]
    fn actions_after_close_are_usage_errors() {
        let (mut e, _log1, _log2) = engine();
        e.handle(PanelAction::Close);
        let msgs = e.handle(PanelAction::Stop);
        for m in &msgs {
            assert!(matches!(
                m,
                PanelMessage::ChannelResult { result: Err(StimError::Usage { .. }), .. }
            ));
        }
        assert_eq!(msgs.len(), 2);
        assert!(!e.coordinator().channel(ChannelId::Dac1).is_open());
    }

    #[test]
    fn dry_run_reports_wire_bytes() {
        let (e, log1, log2) = engine();
        let mut e = e.with_wire_logs(log1.clone(), log2);
        let msgs = e.handle(PanelAction::Display(true));
        let text: Vec<String> = msgs.iter().map(|m| m.to_string()).collect();
        assert!(text.contains(&"DAC1 wire: 45 01".to_owned()));
        assert!(text.contains(&"DAC2 wire: 45 01".to_owned()));
        assert!(log1.bytes().is_empty());
    }

    #[test]
    fn connect_in_dry_run_wakes_both() {
        let config = PanelConfig {
            dry_run: true,
            settle_delay_ms: 0,
            ..PanelConfig::default()
        };
        let mut e = PanelEngine::connect(&config).unwrap();
        let msgs = e.handle(PanelAction::Blink);
        let text: Vec<String> = msgs.iter().map(|m| m.to_string()).collect();
        // wake byte from startup is still in the log at the first report
        assert!(text.contains(&"DAC1 wire: FF 63".to_owned()));
        assert!(text.contains(&"DAC2 wire: FF 63".to_owned()));
    }

    #[test]
    fn quit_and_help_do_not_touch_channels() {
        let (mut e, log1, _log2) = engine();
        assert!(matches!(e.handle(PanelAction::Quit).as_slice(), [PanelMessage::Quit]));
        assert!(matches!(e.handle(PanelAction::Help).as_slice(), [PanelMessage::Log(_)]));
        assert_eq!(e.handle(PanelAction::Show).len(), InputField::ALL.len());
        assert!(log1.bytes().is_empty());
    }
}
