//! Database entities module

pub mod billing_plan;
pub mod booking;
pub mod booking_id_reservation;
pub mod charging_point;
pub mod charging_session;
pub mod payment;
pub mod vehicle;
pub mod wallet;
pub mod wallet_transaction;

pub use billing_plan::Entity as BillingPlan;
pub use booking::Entity as Booking;
pub use charging_point::Entity as ChargingPoint;
pub use charging_session::Entity as ChargingSession;
pub use payment::Entity as Payment;
pub use vehicle::Entity as Vehicle;
pub use wallet::Entity as Wallet;
pub use wallet_transaction::Entity as WalletTransaction;
