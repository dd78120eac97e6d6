//! Wallet transaction entity (append-only)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub wallet_id: i32,

    /// Signed amount: positive credit, negative debit
    pub amount: i64,

    /// TOP_UP, BOOKING_DEPOSIT, DEPOSIT_REFUND, SESSION_CHARGE, SETTLEMENT_REFUND
    pub kind: String,

    #[sea_orm(nullable)]
    pub booking_id: Option<i32>,

    #[sea_orm(nullable)]
    pub session_id: Option<i32>,

    pub balance_after: i64,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
