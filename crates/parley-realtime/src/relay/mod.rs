//! Message relay: per-connection state machine, send path, and the bus
//! subscriber path.

#[allow(clippy::module_inception)]
pub mod relay;
pub mod router;
pub mod subscriber;

pub use relay::{MessageRelay, SendReceipt};
pub use router::{Delivery, DeliveryRouter};
