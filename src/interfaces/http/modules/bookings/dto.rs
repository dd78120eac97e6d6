//! Booking DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::NewBooking;
use crate::domain::{Booking, BookingStatus};

/// Booking creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub point_id: i32,
    pub vehicle_id: i32,
    /// Slot start (RFC 3339)
    pub booking_time: DateTime<Utc>,
    /// Target SOC, defaults to 100
    #[validate(range(min = 1, max = 100))]
    pub desired_percentage: Option<i32>,
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(req: CreateBookingRequest) -> Self {
        NewBooking {
            point_id: req.point_id,
            vehicle_id: req.vehicle_id,
            booking_time: req.booking_time,
            desired_percentage: req.desired_percentage,
        }
    }
}

/// Booking as returned by the API.
///
/// Check-in echoes `point_id` and `vehicle_id` so a client can start the
/// session right away.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingDto {
    pub id: i32,
    pub user_id: i32,
    pub vehicle_id: i32,
    pub point_id: i32,
    pub booking_time: DateTime<Utc>,
    pub estimated_end_time: DateTime<Utc>,
    pub desired_percentage: i32,
    pub deposit_amount: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            vehicle_id: b.vehicle_id,
            point_id: b.point_id,
            booking_time: b.booking_time,
            estimated_end_time: b.estimated_end_time,
            desired_percentage: b.desired_percentage,
            deposit_amount: b.deposit_amount,
            status: b.status,
            created_at: b.created_at,
            checked_in_at: b.checked_in_at,
        }
    }
}
