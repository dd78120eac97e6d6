use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Insufficient funds in wallet {wallet_id}: required {required}, available {available}")]
    InsufficientFunds {
        wallet_id: i32,
        required: i64,
        available: i64,
    },

    #[error("Store contention: {0}")]
    Contention(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Whether this error is likely transient (lock timeout, busy database)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Contention(_))
    }
}

/// Map a database error to a domain error.
///
/// Unique-constraint violations become [`DomainError::Conflict`]. Lock
/// timeouts, busy/locked databases and deadlocks become
/// [`DomainError::Contention`]; everything else is a plain storage failure.
pub fn db_err(e: sea_orm::DbErr) -> DomainError {
    if let Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) = e.sql_err() {
        return DomainError::Conflict(detail);
    }
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("database is locked")
        || lower.contains("database is busy")
        || lower.contains("lock timeout")
        || lower.contains("could not obtain lock")
        || lower.contains("deadlock")
    {
        DomainError::Contention(msg)
    } else {
        DomainError::Storage(msg)
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}
