//! SeaORM implementation of BillingPlanRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::billing_plan::{BillingPlan, BillingPlanRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::billing_plan;
use crate::shared::errors::db_err;

pub struct SeaOrmBillingPlanRepository {
    db: DatabaseConnection,
}

impl SeaOrmBillingPlanRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: billing_plan::Model) -> BillingPlan {
    BillingPlan {
        id: m.id,
        name: m.name,
        price_per_kwh: m.price_per_kwh,
        price_per_minute: m.price_per_minute,
        is_active: m.is_active,
    }
}

#[async_trait]
impl BillingPlanRepository for SeaOrmBillingPlanRepository {
    async fn save(&self, plan: BillingPlan) -> DomainResult<()> {
        let model = billing_plan::ActiveModel {
            id: Set(plan.id),
            name: Set(plan.name),
            price_per_kwh: Set(plan.price_per_kwh),
            price_per_minute: Set(plan.price_per_minute),
            is_active: Set(plan.is_active),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_active(&self) -> DomainResult<Option<BillingPlan>> {
        let model = billing_plan::Entity::find()
            .filter(billing_plan::Column::IsActive.eq(true))
            .order_by_desc(billing_plan::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }
}
