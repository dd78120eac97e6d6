//! Payment domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Created on session completion, or left as debt after a failed debit
    Unpaid,
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "PENDING" => Self::Pending,
            "COMPLETED" => Self::Completed,
            "CANCELLED" => Self::Cancelled,
            "FAILED" => Self::Failed,
            _ => Self::Unpaid,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the payment was (or will be) covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Wallet,
    Deposit,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wallet => "WALLET",
            Self::Deposit => "DEPOSIT",
            Self::Cash => "CASH",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "DEPOSIT" => Self::Deposit,
            "CASH" => Self::Cash,
            _ => Self::Wallet,
        }
    }
}

/// Payment for exactly one charging session
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: i32,
    pub payer_id: i32,
    pub session_id: i32,
    /// Booking whose deposit was applied
    pub booking_id: Option<i32>,
    /// Session cost
    pub amount: i64,
    /// Portion of `amount` covered by the booking deposit
    pub deposit_applied: i64,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    /// Last time settlement ran for this payment
    pub attempted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A fresh UNPAID payment for a completed session.
    pub fn unpaid(payer_id: i32, session_id: i32, amount: i64, at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            payer_id,
            session_id,
            booking_id: None,
            amount,
            deposit_applied: 0,
            status: PaymentStatus::Unpaid,
            method: PaymentMethod::Wallet,
            attempted_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    pub fn mark_completed(&mut self, method: PaymentMethod, at: DateTime<Utc>) {
        self.status = PaymentStatus::Completed;
        self.method = method;
        self.attempted_at = Some(at);
        self.updated_at = at;
    }

    pub fn mark_unpaid(&mut self, at: DateTime<Utc>) {
        self.status = PaymentStatus::Unpaid;
        self.attempted_at = Some(at);
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_payment_is_unpaid() {
        let p = Payment::unpaid(1, 2, 30_000, Utc::now());
        assert_eq!(p.status, PaymentStatus::Unpaid);
        assert!(!p.is_completed());
        assert_eq!(p.deposit_applied, 0);
        assert!(p.attempted_at.is_none());
    }

    #[test]
    fn debt_records_the_attempt() {
        let at = Utc::now();
        let mut p = Payment::unpaid(1, 2, 30_000, at);
        p.mark_unpaid(at);
        assert_eq!(p.status, PaymentStatus::Unpaid);
        assert_eq!(p.attempted_at, Some(at));
    }

    #[test]
    fn mark_completed_sets_method() {
        let mut p = Payment::unpaid(1, 2, 30_000, Utc::now());
        p.mark_completed(PaymentMethod::Deposit, Utc::now());
        assert!(p.is_completed());
        assert_eq!(p.method, PaymentMethod::Deposit);
    }
}
