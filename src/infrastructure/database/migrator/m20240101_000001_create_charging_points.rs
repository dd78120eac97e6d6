//! Create charging_points table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargingPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingPoints::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingPoints::StationId).integer().not_null())
                    .col(ColumnDef::new(ChargingPoints::Name).string().not_null())
                    .col(ColumnDef::new(ChargingPoints::RatedPowerKw).double().not_null())
                    .col(
                        ColumnDef::new(ChargingPoints::Status)
                            .string()
                            .not_null()
                            .default("AVAILABLE"),
                    )
                    .col(ColumnDef::new(ChargingPoints::CurrentSessionId).integer())
                    .col(
                        ColumnDef::new(ChargingPoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_points_status")
                    .table(ChargingPoints::Table)
                    .col(ChargingPoints::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingPoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingPoints {
    Table,
    Id,
    StationId,
    Name,
    RatedPowerKw,
    Status,
    CurrentSessionId,
    UpdatedAt,
}
