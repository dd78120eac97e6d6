//! Pipeline events
//!
//! Published on the [`EventBus`](super::EventBus) when a session completes,
//! a booking expires or a payment is settled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    SessionCompleted(SessionCompletedEvent),
    BookingExpired(BookingExpiredEvent),
    PaymentSettled(PaymentSettledEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::SessionCompleted(_) => "session_completed",
            Event::BookingExpired(_) => "booking_expired",
            Event::PaymentSettled(_) => "payment_settled",
        }
    }

    pub fn point_id(&self) -> Option<i32> {
        match self {
            Event::SessionCompleted(e) => Some(e.point_id),
            Event::BookingExpired(e) => Some(e.point_id),
            Event::PaymentSettled(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCompletedEvent {
    pub session_id: i32,
    pub driver_id: i32,
    pub point_id: i32,
    pub booking_id: Option<i32>,
    pub cost_total: i64,
    pub timestamp: DateTime<Utc>,
}

/// Why a booking left the active set without charging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// Never checked in within the check-in window
    MissedCheckIn,
    /// Checked in but never started a session
    CheckInTimeout,
}

impl ExpiryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissedCheckIn => "missed_check_in",
            Self::CheckInTimeout => "check_in_timeout",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingExpiredEvent {
    pub booking_id: i32,
    pub user_id: i32,
    pub point_id: i32,
    pub reason: ExpiryReason,
    /// Amount returned to the wallet (0 when the deposit is forfeited)
    pub refunded: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub payment_id: i32,
    pub session_id: i32,
    pub payer_id: i32,
    pub status: String,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
