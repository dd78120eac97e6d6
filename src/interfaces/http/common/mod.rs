//! Shared HTTP building blocks: response envelope, error mapping, caller
//! identity and the validating JSON extractor.

mod current_user;
mod validated_json;

pub use current_user::{CurrentUser, USER_ID_HEADER};
pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::DomainError;

/// Standard API response envelope
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error half of every handler result
pub type ApiError<T> = (StatusCode, Json<ApiResponse<T>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError<T>>;

/// HTTP status for a domain error
pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        DomainError::Contention(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a domain error into the error response of a handler
pub fn domain_error<T>(err: DomainError) -> ApiError<T> {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::Validation("x".into()), 400),
            (DomainError::Conflict("x".into()), 409),
            (DomainError::not_found("Booking", "id", 1), 404),
            (DomainError::Forbidden("x".into()), 403),
            (
                DomainError::InsufficientFunds {
                    wallet_id: 1,
                    required: 2,
                    available: 1,
                },
                402,
            ),
            (DomainError::Contention("x".into()), 503),
            (DomainError::Storage("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(status_for(&err).as_u16(), code, "{err}");
        }
    }

    #[test]
    fn error_envelope_has_no_data() {
        let (status, Json(body)) = domain_error::<()>(DomainError::Conflict("taken".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!body.success);
        assert!(body.data.is_none());
        assert_eq!(body.error.as_deref(), Some("Conflict: taken"));
    }
}
