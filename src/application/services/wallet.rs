//! Wallet ledger service
//!
//! Every balance change goes through [`WalletRepository::apply`], which
//! writes the transaction row together with the new balance.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    DomainError, DomainResult, LedgerEntry, RepositoryProvider, Wallet, WalletTransaction,
    WalletTransactionKind,
};
use crate::shared::clock::SharedClock;

pub struct WalletService {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
}

impl WalletService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self { repos, clock }
    }

    pub async fn get_wallet(&self, user_id: i32) -> DomainResult<Wallet> {
        self.repos
            .wallets()
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Wallet", "user_id", user_id))
    }

    /// Add money to a user's wallet.
    pub async fn credit(&self, user_id: i32, entry: LedgerEntry) -> DomainResult<WalletTransaction> {
        if entry.amount <= 0 {
            return Err(DomainError::Validation("Credit amount must be positive".into()));
        }
        self.apply(user_id, entry).await
    }

    /// Take money from a user's wallet. Fails with `InsufficientFunds`
    /// and leaves the balance untouched when it does not cover the debit.
    pub async fn debit(&self, user_id: i32, entry: LedgerEntry) -> DomainResult<WalletTransaction> {
        if entry.amount >= 0 {
            return Err(DomainError::Validation("Debit amount must be positive".into()));
        }
        self.apply(user_id, entry).await
    }

    /// Top up a wallet, opening it on first use.
    pub async fn top_up(&self, user_id: i32, amount: i64) -> DomainResult<Wallet> {
        if amount <= 0 {
            return Err(DomainError::Validation("Top-up amount must be positive".into()));
        }

        let wallet = match self.repos.wallets().find_by_user(user_id).await? {
            Some(w) => w,
            None => {
                info!(user_id, "Opening wallet");
                self.repos.wallets().create(user_id).await?
            }
        };

        let entry = LedgerEntry::credit(amount, WalletTransactionKind::TopUp, self.clock.now())
            .describe("Wallet top-up");
        let (wallet, _) = self.repos.wallets().apply(wallet.id, entry).await?;

        info!(user_id, amount, balance = wallet.balance, "Wallet topped up");
        Ok(wallet)
    }

    /// Ledger of a user's wallet, oldest first
    pub async fn transactions(&self, user_id: i32) -> DomainResult<Vec<WalletTransaction>> {
        let wallet = self.get_wallet(user_id).await?;
        self.repos.wallets().list_transactions(wallet.id).await
    }

    async fn apply(&self, user_id: i32, entry: LedgerEntry) -> DomainResult<WalletTransaction> {
        let wallet = self.get_wallet(user_id).await?;
        let (_, tx) = self.repos.wallets().apply(wallet.id, entry).await?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::Fixture;
    use crate::shared::clock::Clock;

    #[tokio::test]
    async fn top_up_opens_wallet_and_records_transaction() {
        let fx = Fixture::new();
        let wallet = fx.wallets.top_up(42, 70_000).await.unwrap();
        assert_eq!(wallet.balance, 70_000);

        let txs = fx.wallets.transactions(42).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, WalletTransactionKind::TopUp);
    }

    #[tokio::test]
    async fn balance_matches_sum_of_transactions() {
        let fx = Fixture::new();
        fx.wallets.top_up(1, 10_000).await.unwrap();
        let now = fx.clock.now();

        fx.wallets
            .debit(1, LedgerEntry::debit(4_000, WalletTransactionKind::SessionCharge, now))
            .await
            .unwrap();
        let err = fx
            .wallets
            .debit(1, LedgerEntry::debit(9_000, WalletTransactionKind::SessionCharge, now))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds { .. }));
        fx.wallets
            .credit(1, LedgerEntry::credit(500, WalletTransactionKind::SettlementRefund, now))
            .await
            .unwrap();

        let wallet = fx.wallets.get_wallet(1).await.unwrap();
        let sum: i64 = fx
            .wallets
            .transactions(1)
            .await
            .unwrap()
            .iter()
            .map(|t| t.amount)
            .sum();
        assert_eq!(wallet.balance, 6_500);
        assert_eq!(sum, wallet.balance);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.wallets.top_up(1, 0).await,
            Err(DomainError::Validation(_))
        ));
        fx.wallets.top_up(1, 100).await.unwrap();
        let credit_as_debit = LedgerEntry::credit(10, WalletTransactionKind::TopUp, fx.clock.now());
        assert!(matches!(
            fx.wallets.debit(1, credit_as_debit).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_wallet_is_not_found() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.wallets.get_wallet(404).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
