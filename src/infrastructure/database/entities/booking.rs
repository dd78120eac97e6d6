//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub user_id: i32,
    pub vehicle_id: i32,
    pub point_id: i32,

    pub booking_time: DateTimeUtc,
    pub estimated_end_time: DateTimeUtc,
    pub desired_percentage: i32,
    pub deposit_amount: i64,

    /// CONFIRMED, IN_PROGRESS, COMPLETED, CANCELLED_BY_USER, EXPIRED
    pub status: String,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub checked_in_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_point::Entity",
        from = "Column::PointId",
        to = "super::charging_point::Column::Id"
    )]
    ChargingPoint,
}

impl Related<super::charging_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingPoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
