//! Charging point module: availability checks and live status

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
