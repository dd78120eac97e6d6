//! Charging point aggregate
//!
//! Contains the ChargingPoint entity, its physical status, and repository interface.

pub mod model;
pub mod repository;

pub use model::{ChargingPoint, PointStatus};
pub use repository::ChargingPointRepository;
