//! Charging point DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::PointStatus;

/// Query for `GET /charging-points/{id}/availability`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Requested start time (RFC 3339)
    pub requested_time: DateTime<Utc>,
    pub vehicle_id: i32,
    /// Target SOC, defaults to 100
    #[validate(range(min = 1, max = 100))]
    pub desired_percentage: Option<i32>,
}

/// Effective status of a point right now
#[derive(Debug, Serialize, ToSchema)]
pub struct PointStatusDto {
    pub point_id: i32,
    pub status: PointStatus,
    pub as_of: DateTime<Utc>,
}
