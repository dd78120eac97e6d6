//! Charging session entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "charging_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub driver_id: i32,
    pub vehicle_id: i32,
    pub point_id: i32,

    #[sea_orm(nullable)]
    pub booking_id: Option<i32>,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeUtc>,

    pub start_soc_percent: i32,
    pub end_soc_percent: i32,
    pub target_soc_percent: i32,

    /// Energy delivered in kWh
    pub energy_kwh: f64,

    /// Charging time in minutes
    pub duration_min: f64,

    /// Total cost in smallest currency unit
    pub cost_total: i64,

    /// IN_PROGRESS, COMPLETED
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_point::Entity",
        from = "Column::PointId",
        to = "super::charging_point::Column::Id"
    )]
    ChargingPoint,
    #[sea_orm(has_one = "super::payment::Entity")]
    Payment,
}

impl Related<super::charging_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingPoint.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
