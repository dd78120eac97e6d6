//! Booking id reservation entity
//!
//! One row per id handed out before a booking is saved. The id is taken
//! from the autoincrement key, so no two callers ever get the same one.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking_id_reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub reserved_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
