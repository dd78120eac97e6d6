//! Create payments table
//!
//! One payment per charging session (unique `session_id`).

use sea_orm_migration::prelude::*;

use super::m20240101_000006_create_charging_sessions::ChargingSessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::PayerId).integer().not_null())
                    .col(
                        ColumnDef::new(Payments::SessionId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payments::BookingId).integer())
                    .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payments::DepositApplied)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Payments::Status)
                            .string()
                            .not_null()
                            .default("UNPAID"),
                    )
                    .col(
                        ColumnDef::new(Payments::Method)
                            .string()
                            .not_null()
                            .default("WALLET"),
                    )
                    .col(ColumnDef::new(Payments::AttemptedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_session")
                            .from(Payments::Table, Payments::SessionId)
                            .to(ChargingSessions::Table, ChargingSessions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Payments {
    Table,
    Id,
    PayerId,
    SessionId,
    BookingId,
    Amount,
    DepositApplied,
    Status,
    Method,
    AttemptedAt,
    CreatedAt,
    UpdatedAt,
}
