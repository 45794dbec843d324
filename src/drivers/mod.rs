// src/drivers/mod.rs
// Stimulator wire protocol: opcodes, encoding, transports and channel control.
pub mod channel;
pub mod coordinator;
pub mod encoder;
pub mod error;
pub mod opcode;
pub mod params;
pub mod transport;
// Re-exported for the engine and the operator shell
pub use channel::{open_channel, Channel, ChannelId, DEFAULT_SETTLE_DELAY};
pub use coordinator::{ChannelOutcome, ChannelSelection, Coordinator, DispatchReport};
pub use encoder::{Command, LowByteRule, Parameter, Payload, Polarity, Scale};
pub use error::StimError;
pub use opcode::Opcode;
pub use params::{ChannelInputs, InputField, StimParameters};
pub use transport::{
    MemoryTransport, SerialSettings, SerialTransport, Transport, TransportCapabilities, WireLog,
    DEFAULT_BAUD_RATE,
};
