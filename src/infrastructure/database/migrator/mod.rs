//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_charging_points;
mod m20240101_000002_create_vehicles;
mod m20240101_000003_create_billing_plans;
mod m20240101_000004_create_wallets;
mod m20240101_000005_create_bookings;
mod m20240101_000006_create_charging_sessions;
mod m20240101_000007_create_payments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_charging_points::Migration),
            Box::new(m20240101_000002_create_vehicles::Migration),
            Box::new(m20240101_000003_create_billing_plans::Migration),
            Box::new(m20240101_000004_create_wallets::Migration),
            Box::new(m20240101_000005_create_bookings::Migration),
            Box::new(m20240101_000006_create_charging_sessions::Migration),
            Box::new(m20240101_000007_create_payments::Migration),
        ]
    }
}
