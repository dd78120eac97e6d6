//! Create charging_sessions table

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
                    .table(ChargingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingSessions::DriverId).integer().not_null())
                    .col(ColumnDef::new(ChargingSessions::VehicleId).integer().not_null())
                    .col(ColumnDef::new(ChargingSessions::PointId).integer().not_null())
                    .col(ColumnDef::new(ChargingSessions::BookingId).integer())
                    .col(
                        ColumnDef::new(ChargingSessions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::EndTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ChargingSessions::StartSocPercent)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::EndSocPercent)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::TargetSocPercent)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::EnergyKwh)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::DurationMin)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::CostTotal)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::Status)
                            .string()
                            .not_null()
                            .default("IN_PROGRESS"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_sessions_charging_point")
                            .from(ChargingSessions::Table, ChargingSessions::PointId)
                            .to(ChargingPoints::Table, ChargingPoints::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_status")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_booking")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::BookingId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingSessions {
    Table,
    Id,
    DriverId,
    VehicleId,
    PointId,
    BookingId,
    StartTime,
    EndTime,
    StartSocPercent,
    EndSocPercent,
    TargetSocPercent,
    EnergyKwh,
    DurationMin,
    CostTotal,
    Status,
}
