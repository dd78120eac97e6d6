//! JSON body extractor that also runs `validator` rules
//!
//! Malformed JSON is a 400; a body that parses but breaks a field rule is a
//! 422 listing every offending field.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiResponse;

/// Like `axum::Json<T>`, but `T` has passed `Validate::validate()`.
///
/// ```ignore
/// async fn top_up(ValidatedJson(body): ValidatedJson<TopUpRequest>) { /* amount > 0 */ }
/// ```
pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Invalid(validator::ValidationErrors),
}

impl ValidatedJsonRejection {
    fn describe(errors: &validator::ValidationErrors) -> String {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect();
        fields.sort();
        if fields.is_empty() {
            "Validation failed".to_string()
        } else {
            fields.join("; ")
        }
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Json(rejection) => (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(format!("Invalid JSON: {rejection}"))),
            )
                .into_response(),
            Self::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::<()>::error(Self::describe(&errors))),
            )
                .into_response(),
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;
        value.validate().map_err(ValidatedJsonRejection::Invalid)?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Charge {
        #[validate(range(min = 1))]
        amount: i64,
        #[validate(range(min = 1, max = 100))]
        target_soc: i32,
    }

    async fn accept(ValidatedJson(_body): ValidatedJson<Charge>) -> &'static str {
        "ok"
    }

    async fn post_json(body: &'static str) -> StatusCode {
        use tower::Service;
        let mut svc = Router::new().route("/charge", post(accept)).into_service();
        let req = Request::builder()
            .method("POST")
            .uri("/charge")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        svc.call(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn rules_are_enforced() {
        assert_eq!(post_json(r#"{"amount": 10, "target_soc": 80}"#).await, StatusCode::OK);
        assert_eq!(post_json("{").await, StatusCode::BAD_REQUEST);
        assert_eq!(
            post_json(r#"{"amount": 0, "target_soc": 101}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
