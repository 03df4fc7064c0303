//! Wire protocol: JSON envelopes and typed inbound/outbound messages.

pub mod envelope;
pub mod inbound;
pub mod outbound;

pub use envelope::Envelope;
pub use inbound::InboundMessage;
