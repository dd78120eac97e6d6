//! Payment module: per-session payment and manual settlement

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
