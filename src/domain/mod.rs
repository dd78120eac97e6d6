//! Domain layer: aggregates and repository interfaces

pub mod billing_plan;
pub mod booking;
pub mod charging_point;
pub mod payment;
pub mod repositories;
pub mod session;
pub mod vehicle;
pub mod wallet;

pub use billing_plan::BillingPlan;
pub use booking::{Booking, BookingStatus};
pub use charging_point::{ChargingPoint, PointStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use repositories::{DomainResult, RepositoryProvider};
pub use session::{ChargingSession, SessionStatus};
pub use vehicle::Vehicle;
pub use wallet::{LedgerEntry, Wallet, WalletTransaction, WalletTransactionKind};

pub use crate::shared::errors::DomainError;
