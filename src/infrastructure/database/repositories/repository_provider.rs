//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::billing_plan::BillingPlanRepository;
use crate::domain::booking::BookingRepository;
use crate::domain::charging_point::ChargingPointRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::session::SessionRepository;
use crate::domain::vehicle::VehicleRepository;
use crate::domain::wallet::WalletRepository;

use super::billing_plan_repository::SeaOrmBillingPlanRepository;
use super::booking_repository::SeaOrmBookingRepository;
use super::charging_point_repository::SeaOrmChargingPointRepository;
use super::payment_repository::SeaOrmPaymentRepository;
use super::session_repository::SeaOrmSessionRepository;
use super::vehicle_repository::SeaOrmVehicleRepository;
use super::wallet_repository::SeaOrmWalletRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let point = repos.charging_points().find_by_id(1).await?;
/// let sessions = repos.sessions().find_in_progress().await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    charging_points: SeaOrmChargingPointRepository,
    vehicles: SeaOrmVehicleRepository,
    billing_plans: SeaOrmBillingPlanRepository,
    bookings: SeaOrmBookingRepository,
    sessions: SeaOrmSessionRepository,
    payments: SeaOrmPaymentRepository,
    wallets: SeaOrmWalletRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            charging_points: SeaOrmChargingPointRepository::new(db.clone()),
            vehicles: SeaOrmVehicleRepository::new(db.clone()),
            billing_plans: SeaOrmBillingPlanRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db.clone()),
            sessions: SeaOrmSessionRepository::new(db.clone()),
            payments: SeaOrmPaymentRepository::new(db.clone()),
            wallets: SeaOrmWalletRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn charging_points(&self) -> &dyn ChargingPointRepository {
        &self.charging_points
    }

    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn billing_plans(&self) -> &dyn BillingPlanRepository {
        &self.billing_plans
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn wallets(&self) -> &dyn WalletRepository {
        &self.wallets
    }
}
