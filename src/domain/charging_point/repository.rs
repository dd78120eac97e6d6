//! Charging point repository interface

use async_trait::async_trait;

use super::model::{ChargingPoint, PointStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait ChargingPointRepository: Send + Sync {
    async fn save(&self, point: ChargingPoint) -> DomainResult<()>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingPoint>>;
    async fn find_all(&self) -> DomainResult<Vec<ChargingPoint>>;
    async fn find_by_status(&self, status: PointStatus) -> DomainResult<Vec<ChargingPoint>>;
    async fn update(&self, point: ChargingPoint) -> DomainResult<()>;
    async fn update_status(&self, id: i32, status: PointStatus) -> DomainResult<()>;
}
