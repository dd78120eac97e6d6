//! SeaORM implementation of WalletRepository
//!
//! `apply` runs inside a database transaction. The balance is changed with a
//! conditional `UPDATE ... SET balance = balance + ?` so a debit only goes
//! through while the balance still covers it, even with concurrent writers.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use crate::domain::wallet::{
    LedgerEntry, Wallet, WalletRepository, WalletTransaction, WalletTransactionKind,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{wallet, wallet_transaction};
use crate::shared::errors::db_err;

pub struct SeaOrmWalletRepository {
    db: DatabaseConnection,
}

impl SeaOrmWalletRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn wallet_to_domain(m: wallet::Model) -> Wallet {
    Wallet {
        id: m.id,
        user_id: m.user_id,
        balance: m.balance,
        updated_at: m.updated_at,
    }
}

fn transaction_to_domain(m: wallet_transaction::Model) -> WalletTransaction {
    WalletTransaction {
        id: m.id,
        wallet_id: m.wallet_id,
        amount: m.amount,
        kind: WalletTransactionKind::from_str(&m.kind),
        booking_id: m.booking_id,
        session_id: m.session_id,
        balance_after: m.balance_after,
        description: m.description,
        created_at: m.created_at,
    }
}

#[async_trait]
impl WalletRepository for SeaOrmWalletRepository {
    async fn create(&self, user_id: i32) -> DomainResult<Wallet> {
        if self.find_by_user(user_id).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "User {} already has a wallet",
                user_id
            )));
        }

        let model = wallet::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            balance: Set(0),
            updated_at: Set(Utc::now()),
        };
        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        Ok(wallet_to_domain(inserted))
    }

    async fn find_by_user(&self, user_id: i32) -> DomainResult<Option<Wallet>> {
        let model = wallet::Entity::find()
            .filter(wallet::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(wallet_to_domain))
    }

    async fn apply(
        &self,
        wallet_id: i32,
        entry: LedgerEntry,
    ) -> DomainResult<(Wallet, WalletTransaction)> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mut update = wallet::Entity::update_many()
            .col_expr(
                wallet::Column::Balance,
                Expr::col(wallet::Column::Balance).add(entry.amount),
            )
            .col_expr(wallet::Column::UpdatedAt, Expr::value(entry.at))
            .filter(wallet::Column::Id.eq(wallet_id));
        if entry.is_debit() {
            update = update.filter(wallet::Column::Balance.gte(-entry.amount));
        }
        let result = update.exec(&txn).await.map_err(db_err)?;

        if result.rows_affected == 0 {
            let current = wallet::Entity::find_by_id(wallet_id)
                .one(&txn)
                .await
                .map_err(db_err)?;
            txn.rollback().await.map_err(db_err)?;
            return Err(match current {
                Some(w) => DomainError::InsufficientFunds {
                    wallet_id,
                    required: -entry.amount,
                    available: w.balance,
                },
                None => DomainError::not_found("Wallet", "id", wallet_id),
            });
        }

        let updated = wallet::Entity::find_by_id(wallet_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Wallet", "id", wallet_id))?;

        let row = wallet_transaction::ActiveModel {
            id: NotSet,
            wallet_id: Set(wallet_id),
            amount: Set(entry.amount),
            kind: Set(entry.kind.as_str().to_string()),
            booking_id: Set(entry.booking_id),
            session_id: Set(entry.session_id),
            balance_after: Set(updated.balance),
            description: Set(entry.description),
            created_at: Set(entry.at),
        };
        // A duplicate (session, kind) or (booking, kind) link fails here and
        // takes the balance change back with it.
        let inserted = match row.insert(&txn).await {
            Ok(inserted) => inserted,
            Err(e) => {
                txn.rollback().await.map_err(db_err)?;
                return Err(db_err(e));
            }
        };

        txn.commit().await.map_err(db_err)?;

        debug!(
            wallet_id,
            amount = inserted.amount,
            kind = %inserted.kind,
            balance = updated.balance,
            "Applied wallet entry"
        );
        Ok((wallet_to_domain(updated), transaction_to_domain(inserted)))
    }

    async fn list_transactions(&self, wallet_id: i32) -> DomainResult<Vec<WalletTransaction>> {
        let models = wallet_transaction::Entity::find()
            .filter(wallet_transaction::Column::WalletId.eq(wallet_id))
            .order_by_asc(wallet_transaction::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(transaction_to_domain).collect())
    }

    async fn find_session_transaction(
        &self,
        session_id: i32,
        kind: WalletTransactionKind,
    ) -> DomainResult<Option<WalletTransaction>> {
        let model = wallet_transaction::Entity::find()
            .filter(wallet_transaction::Column::SessionId.eq(session_id))
            .filter(wallet_transaction::Column::Kind.eq(kind.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(transaction_to_domain))
    }

    async fn find_booking_transaction(
        &self,
        booking_id: i32,
        kind: WalletTransactionKind,
    ) -> DomainResult<Option<WalletTransaction>> {
        let model = wallet_transaction::Entity::find()
            .filter(wallet_transaction::Column::BookingId.eq(booking_id))
            .filter(wallet_transaction::Column::Kind.eq(kind.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(transaction_to_domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::{init_database, run_migrations, DatabaseConfig};

    async fn repo() -> SeaOrmWalletRepository {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&db).await.unwrap();
        SeaOrmWalletRepository::new(db)
    }

    #[tokio::test]
    async fn credit_then_debit_keeps_ledger_in_sync() {
        let repo = repo().await;
        let wallet = repo.create(7).await.unwrap();
        let now = Utc::now();

        repo.apply(
            wallet.id,
            LedgerEntry::credit(80_000, WalletTransactionKind::TopUp, now),
        )
        .await
        .unwrap();
        let (after, tx) = repo
            .apply(
                wallet.id,
                LedgerEntry::debit(50_000, WalletTransactionKind::BookingDeposit, now)
                    .for_booking(1),
            )
            .await
            .unwrap();

        assert_eq!(after.balance, 30_000);
        assert_eq!(tx.balance_after, 30_000);
        assert_eq!(tx.booking_id, Some(1));

        let txs = repo.list_transactions(wallet.id).await.unwrap();
        assert_eq!(txs.iter().map(|t| t.amount).sum::<i64>(), after.balance);
    }

    #[tokio::test]
    async fn overdraft_is_rejected_without_side_effects() {
        let repo = repo().await;
        let wallet = repo.create(8).await.unwrap();
        let now = Utc::now();
        repo.apply(
            wallet.id,
            LedgerEntry::credit(10_000, WalletTransactionKind::TopUp, now),
        )
        .await
        .unwrap();

        let err = repo
            .apply(
                wallet.id,
                LedgerEntry::debit(50_000, WalletTransactionKind::BookingDeposit, now),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientFunds {
                required: 50_000,
                available: 10_000,
                ..
            }
        ));
        let current = repo.find_by_user(8).await.unwrap().unwrap();
        assert_eq!(current.balance, 10_000);
        assert_eq!(repo.list_transactions(wallet.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_session_charge_rolls_back() {
        let repo = repo().await;
        let wallet = repo.create(10).await.unwrap();
        let now = Utc::now();
        repo.apply(
            wallet.id,
            LedgerEntry::credit(10_000, WalletTransactionKind::TopUp, now),
        )
        .await
        .unwrap();
        let charge =
            LedgerEntry::debit(4_000, WalletTransactionKind::SessionCharge, now).for_session(5);
        repo.apply(wallet.id, charge.clone()).await.unwrap();

        let err = repo.apply(wallet.id, charge).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let current = repo.find_by_user(10).await.unwrap().unwrap();
        assert_eq!(current.balance, 6_000);
        assert_eq!(repo.list_transactions(wallet.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn session_transaction_lookup_by_kind() {
        let repo = repo().await;
        let wallet = repo.create(9).await.unwrap();
        let now = Utc::now();
        repo.apply(
            wallet.id,
            LedgerEntry::credit(5_000, WalletTransactionKind::SettlementRefund, now)
                .for_session(42),
        )
        .await
        .unwrap();

        assert!(repo
            .find_session_transaction(42, WalletTransactionKind::SettlementRefund)
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find_session_transaction(42, WalletTransactionKind::SessionCharge)
            .await
            .unwrap()
            .is_none());
    }
}
