//! # EV Charging Hub
//!
//! Reservation-to-settlement backend for EV charging points: drivers book a
//! slot against a wallet deposit, check in, charge (simulated), and the
//! session cost is settled against the deposit and wallet.
//!
//! ## Architecture
//!
//! - **domain**: entities, state machines and repository traits
//! - **application**: services, background jobs and the event bus
//! - **infrastructure**: SeaORM persistence and the in-memory store
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime wiring and graceful shutdown
//! - **shared**: errors, clock, retry and shutdown primitives

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig, InMemoryRepositoryProvider};

pub use interfaces::create_api_router;

pub use application::{create_event_bus, Event, EventBus, SharedEventBus};

pub use server::{init_tracing, ServerHandle, ServerOptions};
