//! Wire events and bus envelopes.

pub mod envelope;
pub mod types;
pub mod validator;

pub use envelope::DeliveryEnvelope;
pub use types::{InboundEvent, OutboundEvent};
