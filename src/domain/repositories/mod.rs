//! Repository access for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: unified access to all per-aggregate repositories
//! - `DomainResult`: standard result type for domain operations

use super::billing_plan::BillingPlanRepository;
use super::booking::BookingRepository;
use super::charging_point::ChargingPointRepository;
use super::payment::PaymentRepository;
use super::session::SessionRepository;
use super::vehicle::VehicleRepository;
use super::wallet::WalletRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let point = repos.charging_points().find_by_id(1).await?;
///     let session = repos.sessions().find_active_for_point(1).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn charging_points(&self) -> &dyn ChargingPointRepository;
    fn vehicles(&self) -> &dyn VehicleRepository;
    fn billing_plans(&self) -> &dyn BillingPlanRepository;
    fn bookings(&self) -> &dyn BookingRepository;
    fn sessions(&self) -> &dyn SessionRepository;
    fn payments(&self) -> &dyn PaymentRepository;
    fn wallets(&self) -> &dyn WalletRepository;
}
