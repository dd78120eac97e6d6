//! Payment API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::dto::PaymentDto;
use crate::application::SettlementService;
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult, CurrentUser};

#[derive(Clone)]
pub struct PaymentState {
    pub settlement: Arc<SettlementService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/session/{session_id}",
    tag = "Payments",
    params(("session_id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Payment of the session", body = ApiResponse<PaymentDto>),
        (status = 403, description = "Payment belongs to another user"),
        (status = 404, description = "No payment for this session")
    ),
    security(("user_id" = []))
)]
pub async fn get_session_payment(
    State(state): State<PaymentState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<i32>,
) -> ApiResult<PaymentDto> {
    state
        .settlement
        .payment_for_session(user_id, session_id)
        .await
        .map(|p| Json(ApiResponse::success(p.into())))
        .map_err(domain_error)
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/session/{session_id}/settle",
    tag = "Payments",
    params(("session_id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Settlement outcome; UNPAID when the wallet is short", body = ApiResponse<PaymentDto>),
        (status = 400, description = "Session still running"),
        (status = 503, description = "Store busy, retry later")
    ),
    security(("user_id" = []))
)]
pub async fn settle_session(
    State(state): State<PaymentState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<i32>,
) -> ApiResult<PaymentDto> {
    state
        .settlement
        .settle_for_driver(user_id, session_id)
        .await
        .map(|p| Json(ApiResponse::success(p.into())))
        .map_err(domain_error)
}
