//! SeaORM implementation of ChargingPointRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::domain::charging_point::{ChargingPoint, ChargingPointRepository, PointStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::charging_point;
use crate::shared::errors::db_err;

pub struct SeaOrmChargingPointRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargingPointRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: charging_point::Model) -> ChargingPoint {
    ChargingPoint {
        id: m.id,
        station_id: m.station_id,
        name: m.name,
        rated_power_kw: m.rated_power_kw,
        status: PointStatus::from_str(&m.status),
        current_session_id: m.current_session_id,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(p: ChargingPoint) -> charging_point::ActiveModel {
    charging_point::ActiveModel {
        id: Set(p.id),
        station_id: Set(p.station_id),
        name: Set(p.name),
        rated_power_kw: Set(p.rated_power_kw),
        status: Set(p.status.as_str().to_string()),
        current_session_id: Set(p.current_session_id),
        updated_at: Set(p.updated_at),
    }
}

#[async_trait]
impl ChargingPointRepository for SeaOrmChargingPointRepository {
    async fn save(&self, point: ChargingPoint) -> DomainResult<()> {
        debug!(point_id = point.id, "Saving charging point");
        domain_to_active(point)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingPoint>> {
        let model = charging_point::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargingPoint>> {
        let models = charging_point::Entity::find()
            .order_by_asc(charging_point::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_by_status(&self, status: PointStatus) -> DomainResult<Vec<ChargingPoint>> {
        let models = charging_point::Entity::find()
            .filter(charging_point::Column::Status.eq(status.as_str()))
            .order_by_asc(charging_point::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update(&self, point: ChargingPoint) -> DomainResult<()> {
        debug!(point_id = point.id, status = point.status.as_str(), "Updating charging point");

        let existing = charging_point::Entity::find_by_id(point.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("ChargingPoint", "id", point.id));
        }

        domain_to_active(point)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_status(&self, id: i32, status: PointStatus) -> DomainResult<()> {
        let model = charging_point::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", "id", id))?;

        let mut active: charging_point::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
