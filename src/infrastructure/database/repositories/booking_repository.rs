//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Select, Set,
};
use sea_orm::sea_query::SimpleExpr;
use tracing::debug;

use crate::domain::booking::{Booking, BookingRepository, BookingStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{booking, booking_id_reservation};
use crate::shared::errors::db_err;

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn all(&self, query: Select<booking::Entity>) -> DomainResult<Vec<Booking>> {
        let models = query
            .order_by_asc(booking::Column::BookingTime)
            .order_by_asc(booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> Booking {
    Booking {
        id: m.id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        point_id: m.point_id,
        booking_time: m.booking_time,
        estimated_end_time: m.estimated_end_time,
        desired_percentage: m.desired_percentage,
        deposit_amount: m.deposit_amount,
        status: BookingStatus::from_str(&m.status),
        created_at: m.created_at,
        checked_in_at: m.checked_in_at,
    }
}

fn domain_to_active(b: Booking) -> booking::ActiveModel {
    booking::ActiveModel {
        id: Set(b.id),
        user_id: Set(b.user_id),
        vehicle_id: Set(b.vehicle_id),
        point_id: Set(b.point_id),
        booking_time: Set(b.booking_time),
        estimated_end_time: Set(b.estimated_end_time),
        desired_percentage: Set(b.desired_percentage),
        deposit_amount: Set(b.deposit_amount),
        status: Set(b.status.as_str().to_string()),
        created_at: Set(b.created_at),
        checked_in_at: Set(b.checked_in_at),
    }
}

fn active_statuses() -> SimpleExpr {
    booking::Column::Status.is_in(BookingStatus::ACTIVE.map(|s| s.as_str()))
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn save(&self, b: Booking) -> DomainResult<()> {
        debug!(booking_id = b.id, point_id = b.point_id, "Saving booking");
        domain_to_active(b).insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update(&self, b: Booking) -> DomainResult<()> {
        debug!(booking_id = b.id, status = b.status.as_str(), "Updating booking");

        let existing = booking::Entity::find_by_id(b.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Booking", "id", b.id));
        }

        domain_to_active(b).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_active_for_user(&self, user_id: i32) -> DomainResult<Vec<Booking>> {
        self.all(
            booking::Entity::find()
                .filter(booking::Column::UserId.eq(user_id))
                .filter(active_statuses()),
        )
        .await
    }

    async fn find_active_for_point_between(
        &self,
        point_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        self.all(
            booking::Entity::find()
                .filter(booking::Column::PointId.eq(point_id))
                .filter(active_statuses())
                .filter(booking::Column::BookingTime.between(from, to)),
        )
        .await
    }

    async fn find_latest_active_at_or_before(
        &self,
        point_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::PointId.eq(point_id))
            .filter(active_statuses())
            .filter(booking::Column::BookingTime.lte(at))
            .order_by_desc(booking::Column::BookingTime)
            .order_by_desc(booking::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_next_active_after(
        &self,
        point_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::PointId.eq(point_id))
            .filter(active_statuses())
            .filter(booking::Column::BookingTime.gt(at))
            .order_by_asc(booking::Column::BookingTime)
            .order_by_asc(booking::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_active_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        self.all(
            booking::Entity::find()
                .filter(active_statuses())
                .filter(booking::Column::BookingTime.between(from, to)),
        )
        .await
    }

    async fn find_confirmed_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        self.all(
            booking::Entity::find()
                .filter(booking::Column::Status.eq(BookingStatus::Confirmed.as_str()))
                .filter(booking::Column::BookingTime.lt(cutoff)),
        )
        .await
    }

    async fn find_checked_in_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        self.all(
            booking::Entity::find()
                .filter(booking::Column::Status.eq(BookingStatus::InProgress.as_str()))
                .filter(booking::Column::CheckedInAt.lt(cutoff)),
        )
        .await
    }

    async fn find_in_progress_for_user_and_point(
        &self,
        user_id: i32,
        point_id: i32,
    ) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .filter(booking::Column::PointId.eq(point_id))
            .filter(booking::Column::Status.eq(BookingStatus::InProgress.as_str()))
            .order_by_desc(booking::Column::CheckedInAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn next_id(&self) -> DomainResult<i32> {
        let reservation = booking_id_reservation::ActiveModel {
            id: NotSet,
            reserved_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(reservation.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::domain::charging_point::{ChargingPoint, ChargingPointRepository};
    use crate::infrastructure::database::repositories::charging_point_repository::SeaOrmChargingPointRepository;
    use crate::infrastructure::database::{init_database, run_migrations, DatabaseConfig};

    async fn repo() -> SeaOrmBookingRepository {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&db).await.unwrap();
        SeaOrmChargingPointRepository::new(db.clone())
            .save(ChargingPoint::new(1, 1, "A1", 22.0))
            .await
            .unwrap();
        SeaOrmBookingRepository::new(db)
    }

    fn booking(id: i32, at: DateTime<Utc>) -> Booking {
        Booking::new(id, 1, 1, 1, at, at + Duration::hours(1), 80, 50_000, at)
    }

    #[tokio::test]
    async fn neighbour_queries_ignore_inactive_bookings() {
        let repo = repo().await;
        let t0 = Utc::now();

        repo.save(booking(1, t0)).await.unwrap();
        repo.save(booking(2, t0 + Duration::hours(2))).await.unwrap();
        let mut cancelled = booking(3, t0 + Duration::hours(1));
        cancelled.cancel_by_user();
        repo.save(cancelled).await.unwrap();

        let prev = repo
            .find_latest_active_at_or_before(1, t0 + Duration::minutes(90))
            .await
            .unwrap();
        assert_eq!(prev.map(|b| b.id), Some(1));

        let next = repo.find_next_active_after(1, t0).await.unwrap();
        assert_eq!(next.map(|b| b.id), Some(2));
    }

    #[tokio::test]
    async fn concurrent_callers_get_distinct_ids() {
        let repo = repo().await;
        let (a, b, c) = tokio::join!(repo.next_id(), repo.next_id(), repo.next_id());
        let mut ids = vec![a.unwrap(), b.unwrap(), c.unwrap()];
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(repo.next_id().await.unwrap() > ids[2]);
    }
}
