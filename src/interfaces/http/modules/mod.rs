pub mod bookings;
pub mod charging_points;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod sessions;
pub mod wallet;
