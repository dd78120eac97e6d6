//! Create billing_plans table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BillingPlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillingPlans::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BillingPlans::Name).string().not_null())
                    .col(
                        ColumnDef::new(BillingPlans::PricePerKwh)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BillingPlans::PricePerMinute)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BillingPlans::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BillingPlans::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum BillingPlans {
    Table,
    Id,
    Name,
    PricePerKwh,
    PricePerMinute,
    IsActive,
}
