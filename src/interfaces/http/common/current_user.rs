//! Caller identity extractor
//!
//! Authentication happens in front of this service; the gateway forwards
//! the authenticated user id in `X-User-Id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ApiResponse;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Id of the calling user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i32);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing X-User-Id header"))?;

        match raw.trim().parse::<i32>() {
            Ok(id) if id > 0 => Ok(CurrentUser(id)),
            _ => Err(unauthorized("Invalid X-User-Id header")),
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;

    async fn whoami(CurrentUser(id): CurrentUser) -> String {
        id.to_string()
    }

    async fn send(req: Request<Body>) -> Response {
        use tower::Service;
        let mut svc = Router::new().route("/me", get(whoami)).into_service();
        svc.call(req).await.unwrap()
    }

    #[tokio::test]
    async fn header_is_required_and_numeric() {
        let ok = Request::builder()
            .uri("/me")
            .header("X-User-Id", "7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(ok).await.status(), StatusCode::OK);

        let missing = Request::builder().uri("/me").body(Body::empty()).unwrap();
        assert_eq!(send(missing).await.status(), StatusCode::UNAUTHORIZED);

        let garbage = Request::builder()
            .uri("/me")
            .header("X-User-Id", "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(garbage).await.status(), StatusCode::UNAUTHORIZED);
    }
}
