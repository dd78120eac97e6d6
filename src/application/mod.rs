//! Use cases: booking, charging, settlement and the background jobs that
//! keep point status and bookings in step with the clock.

pub mod events;
pub mod services;

pub use events::{create_event_bus, Event, EventBus, EventSubscriber, SharedEventBus};
pub use services::{
    AvailabilityResult, AvailabilityService, BookingService, ChargingSessionService, NewBooking,
    SessionProgress, SessionSimulator, SettlementService, StartSession, StatusProjector,
    WalletService,
};
