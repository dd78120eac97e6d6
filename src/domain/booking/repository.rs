//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::Booking;
use crate::domain::DomainResult;

/// "Active" below means status CONFIRMED or IN_PROGRESS.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Save a new booking
    async fn save(&self, booking: Booking) -> DomainResult<()>;

    /// Update an existing booking
    async fn update(&self, booking: Booking) -> DomainResult<()>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>>;

    /// Active bookings held by a user
    async fn find_active_for_user(&self, user_id: i32) -> DomainResult<Vec<Booking>>;

    /// Active bookings on a point whose `booking_time` lies in `[from, to]`
    async fn find_active_for_point_between(
        &self,
        point_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>>;

    /// Latest active booking on a point starting at or before `at`
    async fn find_latest_active_at_or_before(
        &self,
        point_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>>;

    /// Earliest active booking on a point starting strictly after `at`
    async fn find_next_active_after(
        &self,
        point_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>>;

    /// Active bookings on any point whose `booking_time` lies in `[from, to]`
    async fn find_active_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>>;

    /// CONFIRMED bookings whose `booking_time` is before `cutoff`
    async fn find_confirmed_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>>;

    /// IN_PROGRESS bookings checked in before `cutoff`
    async fn find_checked_in_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>>;

    /// IN_PROGRESS booking of a user on a point
    async fn find_in_progress_for_user_and_point(
        &self,
        user_id: i32,
        point_id: i32,
    ) -> DomainResult<Option<Booking>>;

    /// Reserve a booking ID. No two calls ever return the same ID, so a
    /// deposit recorded against it belongs to exactly one booking.
    async fn next_id(&self) -> DomainResult<i32>;
}
