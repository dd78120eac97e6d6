//! Wallet module: balance, ledger, top-up

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
