//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod billing_plan_repository;
pub mod booking_repository;
pub mod charging_point_repository;
pub mod payment_repository;
pub mod repository_provider;
pub mod session_repository;
pub mod vehicle_repository;
pub mod wallet_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
