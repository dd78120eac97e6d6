//! Wallet API handlers

use std::sync::Arc;

use axum::{extract::State, Json};

use super::dto::{TopUpRequest, WalletDto, WalletTransactionDto};
use crate::application::WalletService;
use crate::interfaces::http::common::{
    domain_error, ApiResponse, ApiResult, CurrentUser, ValidatedJson,
};

#[derive(Clone)]
pub struct WalletState {
    pub wallets: Arc<WalletService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    tag = "Wallet",
    responses(
        (status = 200, description = "Caller's wallet", body = ApiResponse<WalletDto>),
        (status = 404, description = "User has no wallet yet")
    ),
    security(("user_id" = []))
)]
pub async fn get_wallet(
    State(state): State<WalletState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<WalletDto> {
    state
        .wallets
        .get_wallet(user_id)
        .await
        .map(|w| Json(ApiResponse::success(w.into())))
        .map_err(domain_error)
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions",
    tag = "Wallet",
    responses(
        (status = 200, description = "Ledger, oldest first", body = ApiResponse<Vec<WalletTransactionDto>>)
    ),
    security(("user_id" = []))
)]
pub async fn list_transactions(
    State(state): State<WalletState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Vec<WalletTransactionDto>> {
    state
        .wallets
        .transactions(user_id)
        .await
        .map(|txs| Json(ApiResponse::success(txs.into_iter().map(Into::into).collect())))
        .map_err(domain_error)
}

#[utoipa::path(
    post,
    path = "/api/v1/wallet/top-up",
    tag = "Wallet",
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Balance after top-up", body = ApiResponse<WalletDto>),
        (status = 422, description = "Amount must be positive")
    ),
    security(("user_id" = []))
)]
pub async fn top_up(
    State(state): State<WalletState>,
    CurrentUser(user_id): CurrentUser,
    ValidatedJson(body): ValidatedJson<TopUpRequest>,
) -> ApiResult<WalletDto> {
    state
        .wallets
        .top_up(user_id, body.amount)
        .await
        .map(|w| Json(ApiResponse::success(w.into())))
        .map_err(domain_error)
}
