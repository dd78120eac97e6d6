//! Wallet domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What a wallet transaction was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTransactionKind {
    /// Money added by the user
    TopUp,
    /// Deposit held when a booking is confirmed
    BookingDeposit,
    /// Partial deposit return after a check-in timeout
    DepositRefund,
    /// Session cost not covered by a deposit
    SessionCharge,
    /// Unused deposit returned at settlement
    SettlementRefund,
}

impl WalletTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopUp => "TOP_UP",
            Self::BookingDeposit => "BOOKING_DEPOSIT",
            Self::DepositRefund => "DEPOSIT_REFUND",
            Self::SessionCharge => "SESSION_CHARGE",
            Self::SettlementRefund => "SETTLEMENT_REFUND",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "BOOKING_DEPOSIT" => Self::BookingDeposit,
            "DEPOSIT_REFUND" => Self::DepositRefund,
            "SESSION_CHARGE" => Self::SessionCharge,
            "SETTLEMENT_REFUND" => Self::SettlementRefund,
            _ => Self::TopUp,
        }
    }
}

/// One wallet per user
#[derive(Debug, Clone)]
pub struct Wallet {
    pub id: i32,
    pub user_id: i32,
    /// Never negative; equals the signed sum of the wallet's transactions
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Immutable ledger row
#[derive(Debug, Clone)]
pub struct WalletTransaction {
    pub id: i32,
    pub wallet_id: i32,
    /// Signed: positive credits, negative debits
    pub amount: i64,
    pub kind: WalletTransactionKind,
    pub booking_id: Option<i32>,
    pub session_id: Option<i32>,
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A balance change to apply to a wallet
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub amount: i64,
    pub kind: WalletTransactionKind,
    pub booking_id: Option<i32>,
    pub session_id: Option<i32>,
    pub description: Option<String>,
    pub at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn credit(amount: i64, kind: WalletTransactionKind, at: DateTime<Utc>) -> Self {
        Self {
            amount: amount.abs(),
            kind,
            booking_id: None,
            session_id: None,
            description: None,
            at,
        }
    }

    pub fn debit(amount: i64, kind: WalletTransactionKind, at: DateTime<Utc>) -> Self {
        Self {
            amount: -amount.abs(),
            ..Self::credit(amount, kind, at)
        }
    }

    pub fn for_booking(mut self, booking_id: i32) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    pub fn for_session(mut self, session_id: i32) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}
