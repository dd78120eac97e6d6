//! Wallet repository interface

use async_trait::async_trait;

use super::model::{LedgerEntry, Wallet, WalletTransaction, WalletTransactionKind};
use crate::domain::DomainResult;

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Create an empty wallet for a user
    async fn create(&self, user_id: i32) -> DomainResult<Wallet>;

    async fn find_by_user(&self, user_id: i32) -> DomainResult<Option<Wallet>>;

    /// Apply an entry atomically: check, update the balance and append the
    /// transaction row in one unit of work.
    ///
    /// A debit that would make the balance negative fails with
    /// `DomainError::InsufficientFunds` and leaves the wallet unchanged.
    /// An entry linked to a session or booking that already has a
    /// transaction of the same kind fails with `DomainError::Conflict`, also
    /// without touching the balance.
    async fn apply(
        &self,
        wallet_id: i32,
        entry: LedgerEntry,
    ) -> DomainResult<(Wallet, WalletTransaction)>;

    /// Transactions of a wallet, oldest first
    async fn list_transactions(&self, wallet_id: i32) -> DomainResult<Vec<WalletTransaction>>;

    /// Transaction of the given kind linked to a session, if any
    async fn find_session_transaction(
        &self,
        session_id: i32,
        kind: WalletTransactionKind,
    ) -> DomainResult<Option<WalletTransaction>>;

    /// Transaction of the given kind linked to a booking, if any
    async fn find_booking_transaction(
        &self,
        booking_id: i32,
        kind: WalletTransactionKind,
    ) -> DomainResult<Option<WalletTransaction>>;
}
