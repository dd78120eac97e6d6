//! Payment repository interface

use async_trait::async_trait;

use super::model::Payment;
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new payment, returning it with its assigned ID.
    ///
    /// Fails with a conflict if the session already has a payment.
    async fn create(&self, payment: Payment) -> DomainResult<Payment>;
    async fn update(&self, payment: Payment) -> DomainResult<()>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Payment>>;
    async fn find_by_session(&self, session_id: i32) -> DomainResult<Option<Payment>>;
    /// UNPAID payments settlement has never run for, oldest first
    async fn find_unattempted(&self) -> DomainResult<Vec<Payment>>;
}
