//! Booking API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::dto::{BookingDto, CreateBookingRequest};
use crate::application::BookingService;
use crate::interfaces::http::common::{
    domain_error, ApiError, ApiResponse, ApiResult, CurrentUser, ValidatedJson,
};

/// Booking handler state
#[derive(Clone)]
pub struct BookingState {
    pub bookings: Arc<BookingService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking confirmed, deposit held", body = ApiResponse<BookingDto>),
        (status = 402, description = "Wallet cannot cover the deposit"),
        (status = 403, description = "Vehicle belongs to another user"),
        (status = 409, description = "Slot taken, point unavailable or user already holds a booking"),
        (status = 422, description = "Validation error")
    ),
    security(("user_id" = []))
)]
pub async fn create_booking(
    State(state): State<BookingState>,
    CurrentUser(user_id): CurrentUser,
    ValidatedJson(body): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingDto>>), ApiError<BookingDto>> {
    let booking = state
        .bookings
        .create_booking(user_id, body.into())
        .await
        .map_err(domain_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(booking.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_id}",
    tag = "Bookings",
    params(("booking_id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDto>),
        (status = 403, description = "Booking belongs to another user"),
        (status = 404, description = "Booking not found")
    ),
    security(("user_id" = []))
)]
pub async fn get_booking(
    State(state): State<BookingState>,
    CurrentUser(user_id): CurrentUser,
    Path(booking_id): Path<i32>,
) -> ApiResult<BookingDto> {
    state
        .bookings
        .get_booking(user_id, booking_id)
        .await
        .map(|b| Json(ApiResponse::success(b.into())))
        .map_err(domain_error)
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/check-in",
    tag = "Bookings",
    params(("booking_id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Checked in", body = ApiResponse<BookingDto>),
        (status = 400, description = "Outside the check-in window"),
        (status = 409, description = "Booking is not confirmed")
    ),
    security(("user_id" = []))
)]
pub async fn check_in(
    State(state): State<BookingState>,
    CurrentUser(user_id): CurrentUser,
    Path(booking_id): Path<i32>,
) -> ApiResult<BookingDto> {
    state
        .bookings
        .check_in_booking(user_id, booking_id)
        .await
        .map(|b| Json(ApiResponse::success(b.into())))
        .map_err(domain_error)
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/cancel",
    tag = "Bookings",
    params(("booking_id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Cancelled, deposit forfeited", body = ApiResponse<BookingDto>),
        (status = 409, description = "Booking already started or not confirmed")
    ),
    security(("user_id" = []))
)]
pub async fn cancel_booking(
    State(state): State<BookingState>,
    CurrentUser(user_id): CurrentUser,
    Path(booking_id): Path<i32>,
) -> ApiResult<BookingDto> {
    state
        .bookings
        .cancel_booking(user_id, booking_id)
        .await
        .map(|b| Json(ApiResponse::success(b.into())))
        .map_err(domain_error)
}
