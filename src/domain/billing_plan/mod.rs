//! Billing plan aggregate (read-only in this service)

pub mod model;
pub mod repository;

pub use model::BillingPlan;
pub use repository::BillingPlanRepository;
