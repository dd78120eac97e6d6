//! Wallet ledger aggregate
//!
//! Contains the Wallet entity, its immutable transaction rows, and the
//! repository interface that applies entries atomically.

pub mod model;
pub mod repository;

pub use model::{LedgerEntry, Wallet, WalletTransaction, WalletTransactionKind};
pub use repository::WalletRepository;
