//! Booking domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Deposit held, waiting for check-in
    Confirmed,
    /// Driver checked in at the point
    InProgress,
    /// The booking's session was settled
    Completed,
    /// Cancelled by the driver (deposit forfeited)
    CancelledByUser,
    /// No check-in, or checked in without starting a session
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::CancelledByUser => "CANCELLED_BY_USER",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "CONFIRMED" => Self::Confirmed,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            "CANCELLED_BY_USER" => Self::CancelledByUser,
            _ => Self::Expired,
        }
    }

    /// Statuses that still hold a slot on the point.
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Confirmed, BookingStatus::InProgress];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-slot booking of a charging point
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: i32,
    pub user_id: i32,
    pub vehicle_id: i32,
    pub point_id: i32,
    /// Start of the booked slot
    pub booking_time: DateTime<Utc>,
    /// Derived end of the slot
    pub estimated_end_time: DateTime<Utc>,
    /// Target state of charge (%)
    pub desired_percentage: i32,
    /// Deposit debited at creation
    pub deposit_amount: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i32,
        user_id: i32,
        vehicle_id: i32,
        point_id: i32,
        booking_time: DateTime<Utc>,
        estimated_end_time: DateTime<Utc>,
        desired_percentage: i32,
        deposit_amount: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            vehicle_id,
            point_id,
            booking_time,
            estimated_end_time,
            desired_percentage,
            deposit_amount,
            status: BookingStatus::Confirmed,
            created_at,
            checked_in_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn check_in(&mut self, at: DateTime<Utc>) {
        self.status = BookingStatus::InProgress;
        self.checked_in_at = Some(at);
    }

    pub fn cancel_by_user(&mut self) {
        self.status = BookingStatus::CancelledByUser;
    }

    pub fn expire(&mut self) {
        self.status = BookingStatus::Expired;
    }

    pub fn complete(&mut self) {
        self.status = BookingStatus::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_booking() -> Booking {
        let at = Utc::now() + Duration::hours(2);
        Booking::new(1, 7, 3, 5, at, at + Duration::minutes(29), 80, 50_000, Utc::now())
    }

    #[test]
    fn new_booking_is_confirmed() {
        let b = sample_booking();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.is_active());
        assert!(b.checked_in_at.is_none());
    }

    #[test]
    fn check_in_moves_to_in_progress() {
        let mut b = sample_booking();
        let at = b.booking_time;
        b.check_in(at);
        assert_eq!(b.status, BookingStatus::InProgress);
        assert_eq!(b.checked_in_at, Some(at));
        assert!(b.is_active());
    }

    #[test]
    fn terminal_statuses_are_inactive() {
        let mut b = sample_booking();
        b.cancel_by_user();
        assert!(!b.is_active());
        b.expire();
        assert!(!b.is_active());
        b.complete();
        assert!(!b.is_active());
    }

    #[test]
    fn status_strings() {
        assert_eq!(BookingStatus::CancelledByUser.as_str(), "CANCELLED_BY_USER");
        assert_eq!(BookingStatus::from_str("IN_PROGRESS"), BookingStatus::InProgress);
        assert_eq!(BookingStatus::from_str("???"), BookingStatus::Expired);
    }
}
