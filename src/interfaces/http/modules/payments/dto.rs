//! Payment DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Payment, PaymentMethod, PaymentStatus};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentDto {
    pub id: i32,
    pub payer_id: i32,
    pub session_id: i32,
    pub booking_id: Option<i32>,
    /// Session cost
    pub amount: i64,
    /// Part of `amount` covered by the booking deposit
    pub deposit_applied: i64,
    /// Part of `amount` still owed when the payment is unpaid
    pub outstanding: i64,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        let outstanding = if p.status == PaymentStatus::Completed {
            0
        } else {
            (p.amount - p.deposit_applied).max(0)
        };
        Self {
            id: p.id,
            payer_id: p.payer_id,
            session_id: p.session_id,
            booking_id: p.booking_id,
            amount: p.amount,
            deposit_applied: p.deposit_applied,
            outstanding,
            status: p.status,
            method: p.method,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
