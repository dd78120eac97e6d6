//! SeaORM implementation of PaymentRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::domain::payment::{Payment, PaymentMethod, PaymentRepository, PaymentStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::payment;
use crate::shared::errors::db_err;

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: payment::Model) -> Payment {
    Payment {
        id: m.id,
        payer_id: m.payer_id,
        session_id: m.session_id,
        booking_id: m.booking_id,
        amount: m.amount,
        deposit_applied: m.deposit_applied,
        status: PaymentStatus::from_str(&m.status),
        method: PaymentMethod::from_str(&m.method),
        attempted_at: m.attempted_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(p: Payment) -> payment::ActiveModel {
    payment::ActiveModel {
        id: Set(p.id),
        payer_id: Set(p.payer_id),
        session_id: Set(p.session_id),
        booking_id: Set(p.booking_id),
        amount: Set(p.amount),
        deposit_applied: Set(p.deposit_applied),
        status: Set(p.status.as_str().to_string()),
        method: Set(p.method.as_str().to_string()),
        attempted_at: Set(p.attempted_at),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    }
}

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn create(&self, p: Payment) -> DomainResult<Payment> {
        if self.find_by_session(p.session_id).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "Session {} already has a payment",
                p.session_id
            )));
        }

        let mut model = domain_to_active(p);
        model.id = NotSet;
        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        debug!(payment_id = inserted.id, session_id = inserted.session_id, "Created payment");
        Ok(model_to_domain(inserted))
    }

    async fn update(&self, p: Payment) -> DomainResult<()> {
        let existing = payment::Entity::find_by_id(p.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Payment", "id", p.id));
        }

        domain_to_active(p).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_session(&self, session_id: i32) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_unattempted(&self) -> DomainResult<Vec<Payment>> {
        let models = payment::Entity::find()
            .filter(payment::Column::Status.eq(PaymentStatus::Unpaid.as_str()))
            .filter(payment::Column::AttemptedAt.is_null())
            .order_by_asc(payment::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
