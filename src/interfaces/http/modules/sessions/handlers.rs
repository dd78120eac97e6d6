//! Charging session API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::dto::{SessionDto, StartSessionRequest};
use crate::application::{ChargingSessionService, SessionProgress};
use crate::interfaces::http::common::{
    domain_error, ApiError, ApiResponse, ApiResult, CurrentUser, ValidatedJson,
};

/// Session handler state
#[derive(Clone)]
pub struct SessionState {
    pub sessions: Arc<ChargingSessionService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = ApiResponse<SessionDto>),
        (status = 400, description = "Invalid SOC range"),
        (status = 403, description = "Vehicle or booking belongs to another user"),
        (status = 409, description = "Point busy, reserved for someone else or out of service")
    ),
    security(("user_id" = []))
)]
pub async fn start_session(
    State(state): State<SessionState>,
    CurrentUser(user_id): CurrentUser,
    ValidatedJson(body): ValidatedJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionDto>>), ApiError<SessionDto>> {
    let session = state
        .sessions
        .start_session(user_id, body.into())
        .await
        .map_err(domain_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(session.into())),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/stop",
    tag = "Sessions",
    params(("session_id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session completed", body = ApiResponse<SessionDto>),
        (status = 409, description = "Session already completed")
    ),
    security(("user_id" = []))
)]
pub async fn stop_session(
    State(state): State<SessionState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<i32>,
) -> ApiResult<SessionDto> {
    state
        .sessions
        .stop_session(user_id, session_id)
        .await
        .map(|s| Json(ApiResponse::success(s.into())))
        .map_err(domain_error)
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}/progress",
    tag = "Sessions",
    params(("session_id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Live progress", body = ApiResponse<SessionProgress>),
        (status = 404, description = "Session not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_progress(
    State(state): State<SessionState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<i32>,
) -> ApiResult<SessionProgress> {
    state
        .sessions
        .progress(user_id, session_id)
        .await
        .map(|p| Json(ApiResponse::success(p)))
        .map_err(domain_error)
}
