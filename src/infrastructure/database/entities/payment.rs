//! Payment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub payer_id: i32,

    #[sea_orm(unique)]
    pub session_id: i32,

    #[sea_orm(nullable)]
    pub booking_id: Option<i32>,

    pub amount: i64,
    pub deposit_applied: i64,

    /// UNPAID, PENDING, COMPLETED, CANCELLED, FAILED
    pub status: String,

    /// WALLET, DEPOSIT, CASH
    pub method: String,

    #[sea_orm(nullable)]
    pub attempted_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_session::Entity",
        from = "Column::SessionId",
        to = "super::charging_session::Column::Id"
    )]
    Session,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
