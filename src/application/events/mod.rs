//! Pipeline events (session completed, booking expired, payment settled)
//! and the broadcast bus that carries them

pub mod event_bus;
pub mod types;

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use types::*;
