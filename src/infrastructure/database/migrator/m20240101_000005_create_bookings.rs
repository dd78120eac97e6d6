//! Create bookings table
//!
//! Stores time-slot bookings with deposit and check-in tracking, plus the
//! reservation table booking ids are drawn from.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_charging_points::ChargingPoints;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::UserId).integer().not_null())
                    .col(ColumnDef::new(Bookings::VehicleId).integer().not_null())
                    .col(ColumnDef::new(Bookings::PointId).integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::BookingTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::EstimatedEndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::DesiredPercentage)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::DepositAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string()
                            .not_null()
                            .default("CONFIRMED"),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::CheckedInAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_charging_point")
                            .from(Bookings::Table, Bookings::PointId)
                            .to(ChargingPoints::Table, ChargingPoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_point_time")
                    .table(Bookings::Table)
                    .col(Bookings::PointId)
                    .col(Bookings::BookingTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_status")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_user")
                    .table(Bookings::Table)
                    .col(Bookings::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingIdReservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingIdReservations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BookingIdReservations::ReservedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BookingIdReservations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    UserId,
    VehicleId,
    PointId,
    BookingTime,
    EstimatedEndTime,
    DesiredPercentage,
    DepositAmount,
    Status,
    CreatedAt,
    CheckedInAt,
}

#[derive(Iden)]
pub enum BookingIdReservations {
    Table,
    Id,
    ReservedAt,
}
