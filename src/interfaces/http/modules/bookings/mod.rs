//! Booking module: reserve, check in, cancel

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
