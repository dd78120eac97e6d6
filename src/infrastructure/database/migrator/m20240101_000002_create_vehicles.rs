//! Create vehicles table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vehicles::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vehicles::OwnerId).integer().not_null())
                    .col(ColumnDef::new(Vehicles::Name).string().not_null())
                    .col(ColumnDef::new(Vehicles::BatteryCapacityKwh).double().not_null())
                    .col(ColumnDef::new(Vehicles::MaxChargingPowerKw).double().not_null())
                    .col(
                        ColumnDef::new(Vehicles::CurrentSocPercent)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vehicles_owner")
                    .table(Vehicles::Table)
                    .col(Vehicles::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Vehicles {
    Table,
    Id,
    OwnerId,
    Name,
    BatteryCapacityKwh,
    MaxChargingPowerKw,
    CurrentSocPercent,
}
