use std::fmt;
use std::str::FromStr;
use log::{error, warn};
use crate::drivers::channel::{Channel, ChannelId};
use crate::drivers::encoder::Polarity;
use crate::drivers::error::StimError;
use crate::drivers::params::StimParameters;
/// Which channel(s) an action addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelSelection {
    Dac1,
    Dac2,
    Both,
}
impl ChannelSelection {
    /// Channels in dispatch order; DAC1 always goes first.
    pub fn channels(self) -> &'static [ChannelId] {
        match self {
            ChannelSelection::Dac1 => &[ChannelId::Dac1],
            ChannelSelection::Dac2 => &[ChannelId::Dac2],
            ChannelSelection::Both => &ChannelId::BOTH,
        }
    }
}
impl FromStr for ChannelSelection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "dac1" => Ok(ChannelSelection::Dac1),
            "2" | "dac2" => Ok(ChannelSelection::Dac2),
            "both" | "all" | "dacs" => Ok(ChannelSelection::Both),
            other => Err(format!("unknown channel '{other}' (expected 1, 2 or both)")),
        }
    }
}
impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelection::Dac1 => write!(f, "DAC1"),
            ChannelSelection::Dac2 => write!(f, "DAC2"),
            ChannelSelection::Both => write!(f, "DAC1 & DAC2"),
        }
    }
}
/// Result of one action on one channel.
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: ChannelId,
    pub result: Result<(), StimError>,
}
/// Per-channel results of a dispatched action, in dispatch order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<ChannelOutcome>,
}
impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
    pub fn outcome(&self, channel: ChannelId) -> Option<&Result<(), StimError>> {
        self.outcomes
            .iter()
            .find(|o| o.channel == channel)
            .map(|o| &o.result)
    }
    pub fn failures(&self) -> impl Iterator<Item = (ChannelId, &StimError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.channel, e)))
    }
}
/// Replays actions across both stimulators. Channels fail independently:
/// an error on DAC1 never prevents the DAC2 attempt, and nothing is rolled back.
pub struct Coordinator {
    dac1: Channel,
    dac2: Channel,
}
impl Coordinator {
    pub fn new(dac1: Channel, dac2: Channel) -> Self {
        debug_assert_eq!(dac1.id(), ChannelId::Dac1);
        debug_assert_eq!(dac2.id(), ChannelId::Dac2);
        Self { dac1, dac2 }
    }
    pub fn channel(&self, id: ChannelId) -> &Channel {
        match id {
            ChannelId::Dac1 => &self.dac1,
            ChannelId::Dac2 => &self.dac2,
        }
    }
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut Channel {
        match id {
            ChannelId::Dac1 => &mut self.dac1,
            ChannelId::Dac2 => &mut self.dac2,
        }
    }
    /// Runs `op` on every selected channel, DAC1 first, collecting each result.
    pub fn for_each<F>(&mut self, selection: ChannelSelection, mut op: F) -> DispatchReport
    where
        F: FnMut(&mut Channel) -> Result<(), StimError>,
    {
        let mut report = DispatchReport::default();
        for &id in selection.channels() {
            let result = op(self.channel_mut(id));
            match &result {
                Err(e) if e.is_input_error() => warn!("{id}: {e}"),
                Err(e) => error!("{id}: {e}"),
                Ok(()) => {}
            }
            report.outcomes.push(ChannelOutcome { channel: id, result });
        }
        report
    }
    pub fn wake(&mut self, selection: ChannelSelection) -> DispatchReport {
        self.for_each(selection, Channel::wake)
    }
    pub fn blink(&mut self) -> DispatchReport {
        self.for_each(ChannelSelection::Both, Channel::blink)
    }
    pub fn set_display(&mut self, on: bool) -> DispatchReport {
        self.for_each(ChannelSelection::Both, |ch| ch.set_display(on))
    }
    pub fn reset_counter(&mut self) -> DispatchReport {
        self.for_each(ChannelSelection::Both, Channel::reset_counter)
    }
    pub fn start(&mut self, selection: ChannelSelection) -> DispatchReport {
        self.for_each(selection, Channel::start)
    }
    pub fn stop(&mut self) -> DispatchReport {
        self.for_each(ChannelSelection::Both, Channel::stop)
    }
    pub fn set_polarity(&mut self, polarity: Polarity) -> DispatchReport {
        self.for_each(ChannelSelection::Both, |ch| ch.set_polarity(polarity))
    }
    /// Sends a full parameter set to each selected channel. `params_for` is
    /// asked once per channel so each channel only ever sees its own values.
    pub fn apply<F>(&mut self, selection: ChannelSelection, mut params_for: F) -> DispatchReport
    where
        F: FnMut(ChannelId) -> Result<StimParameters, StimError>,
    {
        self.for_each(selection, |ch| {
            let params = params_for(ch.id())?;
            ch.apply(&params)
        })
    }
    pub fn close(&mut self) -> DispatchReport {
        self.for_each(ChannelSelection::Both, Channel::close)
    }
}
