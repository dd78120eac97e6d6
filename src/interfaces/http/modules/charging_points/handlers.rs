//! Charging point API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::dto::{AvailabilityQuery, PointStatusDto};
use crate::application::{AvailabilityResult, AvailabilityService};
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult};
use crate::shared::clock::SharedClock;

/// Charging point handler state
#[derive(Clone)]
pub struct ChargingPointState {
    pub availability: Arc<AvailabilityService>,
    pub clock: SharedClock,
}

#[utoipa::path(
    get,
    path = "/api/v1/charging-points/{point_id}/availability",
    tag = "Charging Points",
    params(
        ("point_id" = i32, Path, description = "Charging point ID"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Availability verdict", body = ApiResponse<AvailabilityResult>),
        (status = 400, description = "Malformed query"),
        (status = 404, description = "Point or vehicle not found")
    )
)]
pub async fn check_availability(
    State(state): State<ChargingPointState>,
    Path(point_id): Path<i32>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<AvailabilityResult> {
    if let Err(e) = query.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(e.to_string())),
        ));
    }

    state
        .availability
        .check_availability(
            point_id,
            query.requested_time,
            query.vehicle_id,
            query.desired_percentage,
        )
        .await
        .map(|result| Json(ApiResponse::success(result)))
        .map_err(domain_error)
}

#[utoipa::path(
    get,
    path = "/api/v1/charging-points/{point_id}/status",
    tag = "Charging Points",
    params(("point_id" = i32, Path, description = "Charging point ID")),
    responses(
        (status = 200, description = "Effective point status", body = ApiResponse<PointStatusDto>),
        (status = 404, description = "Point not found")
    )
)]
pub async fn get_point_status(
    State(state): State<ChargingPointState>,
    Path(point_id): Path<i32>,
) -> ApiResult<PointStatusDto> {
    let status = state
        .availability
        .calculate_display_status(point_id)
        .await
        .map_err(domain_error)?;

    Ok(Json(ApiResponse::success(PointStatusDto {
        point_id,
        status,
        as_of: state.clock.now(),
    })))
}
