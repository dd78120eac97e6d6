//! Wallet DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{Wallet, WalletTransaction, WalletTransactionKind};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletDto {
    pub id: i32,
    pub user_id: i32,
    /// Minor currency units
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletDto {
    fn from(w: Wallet) -> Self {
        Self {
            id: w.id,
            user_id: w.user_id,
            balance: w.balance,
            updated_at: w.updated_at,
        }
    }
}

/// One ledger line; `amount` is signed
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionDto {
    pub id: i32,
    pub amount: i64,
    pub kind: WalletTransactionKind,
    pub booking_id: Option<i32>,
    pub session_id: Option<i32>,
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransaction> for WalletTransactionDto {
    fn from(t: WalletTransaction) -> Self {
        Self {
            id: t.id,
            amount: t.amount,
            kind: t.kind,
            booking_id: t.booking_id,
            session_id: t.session_id,
            balance_after: t.balance_after,
            description: t.description,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TopUpRequest {
    #[validate(range(min = 1, message = "Top-up amount must be positive"))]
    pub amount: i64,
}
