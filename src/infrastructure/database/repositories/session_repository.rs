//! SeaORM implementation of SessionRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::domain::session::{ChargingSession, SessionRepository, SessionStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::charging_session;
use crate::shared::errors::db_err;

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: charging_session::Model) -> ChargingSession {
    ChargingSession {
        id: m.id,
        driver_id: m.driver_id,
        vehicle_id: m.vehicle_id,
        point_id: m.point_id,
        booking_id: m.booking_id,
        start_time: m.start_time,
        end_time: m.end_time,
        start_soc_percent: m.start_soc_percent,
        end_soc_percent: m.end_soc_percent,
        target_soc_percent: m.target_soc_percent,
        energy_kwh: m.energy_kwh,
        duration_min: m.duration_min,
        cost_total: m.cost_total,
        status: SessionStatus::from_str(&m.status),
    }
}

fn domain_to_active(s: ChargingSession) -> charging_session::ActiveModel {
    charging_session::ActiveModel {
        id: Set(s.id),
        driver_id: Set(s.driver_id),
        vehicle_id: Set(s.vehicle_id),
        point_id: Set(s.point_id),
        booking_id: Set(s.booking_id),
        start_time: Set(s.start_time),
        end_time: Set(s.end_time),
        start_soc_percent: Set(s.start_soc_percent),
        end_soc_percent: Set(s.end_soc_percent),
        target_soc_percent: Set(s.target_soc_percent),
        energy_kwh: Set(s.energy_kwh),
        duration_min: Set(s.duration_min),
        cost_total: Set(s.cost_total),
        status: Set(s.status.as_str().to_string()),
    }
}

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn create(&self, session: ChargingSession) -> DomainResult<ChargingSession> {
        let mut model = domain_to_active(session);
        model.id = NotSet;
        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        debug!(session_id = inserted.id, point_id = inserted.point_id, "Created charging session");
        Ok(model_to_domain(inserted))
    }

    async fn update(&self, session: ChargingSession) -> DomainResult<()> {
        let existing = charging_session::Entity::find_by_id(session.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("ChargingSession", "id", session.id));
        }

        domain_to_active(session)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_in_progress(&self, session: ChargingSession) -> DomainResult<bool> {
        let id = session.id;
        let mut model = domain_to_active(session);
        model.id = NotSet;

        let result = charging_session::Entity::update_many()
            .set(model)
            .filter(charging_session::Column::Id.eq(id))
            .filter(charging_session::Column::Status.eq(SessionStatus::InProgress.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_in_progress(&self) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::Status.eq(SessionStatus::InProgress.as_str()))
            .order_by_asc(charging_session::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_active_for_point(&self, point_id: i32) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::PointId.eq(point_id))
            .filter(charging_session::Column::Status.eq(SessionStatus::InProgress.as_str()))
            .order_by_desc(charging_session::Column::StartTime)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_booking(&self, booking_id: i32) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::BookingId.eq(booking_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }
}
