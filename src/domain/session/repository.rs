//! Charging session repository interface

use async_trait::async_trait;

use super::model::ChargingSession;
use crate::domain::DomainResult;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new session, returning it with its assigned ID
    async fn create(&self, session: ChargingSession) -> DomainResult<ChargingSession>;
    async fn update(&self, session: ChargingSession) -> DomainResult<()>;
    /// Write the session only while the stored row is still IN_PROGRESS.
    ///
    /// Returns `false`, leaving the row untouched, when the session has
    /// already finished.
    async fn update_in_progress(&self, session: ChargingSession) -> DomainResult<bool>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingSession>>;
    /// All IN_PROGRESS sessions
    async fn find_in_progress(&self) -> DomainResult<Vec<ChargingSession>>;
    /// IN_PROGRESS session on a point, if any
    async fn find_active_for_point(&self, point_id: i32) -> DomainResult<Option<ChargingSession>>;
    /// Session started from a booking, if any
    async fn find_by_booking(&self, booking_id: i32) -> DomainResult<Option<ChargingSession>>;
}
