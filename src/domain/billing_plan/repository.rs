//! Billing plan repository interface

use async_trait::async_trait;

use super::model::BillingPlan;
use crate::domain::DomainResult;

#[async_trait]
pub trait BillingPlanRepository: Send + Sync {
    async fn save(&self, plan: BillingPlan) -> DomainResult<()>;
    /// The plan currently applied to new completions, if any.
    async fn find_active(&self) -> DomainResult<Option<BillingPlan>>;
}
