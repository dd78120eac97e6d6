//! Application services

mod availability;
mod booking;
mod booking_expiry;
mod charging_session;
mod session_simulator;
mod settlement;
mod status_projector;
mod wallet;

#[cfg(test)]
pub(crate) mod test_support;

pub use availability::{display_status, reservation_window, AvailabilityResult, AvailabilityService};
pub use booking::{BookingService, NewBooking};
pub use booking_expiry::{start_booking_expiry_task, start_check_in_timeout_task};
pub use charging_session::{ChargingSessionService, SessionProgress, StartSession};
pub use session_simulator::{SessionSimulator, TickReport};
pub use settlement::SettlementService;
pub use status_projector::{ProjectionReport, StatusProjector};
pub use wallet::WalletService;
