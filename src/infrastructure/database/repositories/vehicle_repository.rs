//! SeaORM implementation of VehicleRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::domain::vehicle::{Vehicle, VehicleRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::vehicle;
use crate::shared::errors::db_err;

pub struct SeaOrmVehicleRepository {
    db: DatabaseConnection,
}

impl SeaOrmVehicleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: vehicle::Model) -> Vehicle {
    Vehicle {
        id: m.id,
        owner_id: m.owner_id,
        name: m.name,
        battery_capacity_kwh: m.battery_capacity_kwh,
        max_charging_power_kw: m.max_charging_power_kw,
        current_soc_percent: m.current_soc_percent,
    }
}

#[async_trait]
impl VehicleRepository for SeaOrmVehicleRepository {
    async fn save(&self, v: Vehicle) -> DomainResult<()> {
        let model = vehicle::ActiveModel {
            id: Set(v.id),
            owner_id: Set(v.owner_id),
            name: Set(v.name),
            battery_capacity_kwh: Set(v.battery_capacity_kwh),
            max_charging_power_kw: Set(v.max_charging_power_kw),
            current_soc_percent: Set(v.current_soc_percent),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn update_soc(&self, id: i32, soc_percent: i32) -> DomainResult<()> {
        let model = vehicle::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", id))?;

        let mut active: vehicle::ActiveModel = model.into();
        active.current_soc_percent = Set(soc_percent.clamp(0, 100));
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
