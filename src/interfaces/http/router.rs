//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::ApiResponse;
use super::modules::{
    bookings, charging_points, health, metrics as metrics_module, payments, sessions, wallet,
};
use crate::application::{
    AvailabilityResult, AvailabilityService, BookingService, ChargingSessionService,
    SessionProgress, SettlementService, WalletService,
};
use crate::domain::{
    BookingStatus, PaymentMethod, PaymentStatus, PointStatus, SessionStatus,
    WalletTransactionKind,
};
use crate::shared::clock::SharedClock;

/// Everything the REST handlers need. Each module extracts its own slice
/// through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub availability: Arc<AvailabilityService>,
    pub bookings: Arc<BookingService>,
    pub sessions: Arc<ChargingSessionService>,
    pub wallets: Arc<WalletService>,
    pub settlement: Arc<SettlementService>,
    pub clock: SharedClock,
    /// `None` on the in-memory store
    pub db: Option<DatabaseConnection>,
    pub started_at: Arc<Instant>,
}

impl FromRef<AppState> for charging_points::ChargingPointState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            availability: Arc::clone(&s.availability),
            clock: Arc::clone(&s.clock),
        }
    }
}

impl FromRef<AppState> for bookings::BookingState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            bookings: Arc::clone(&s.bookings),
        }
    }
}

impl FromRef<AppState> for sessions::SessionState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            sessions: Arc::clone(&s.sessions),
        }
    }
}

impl FromRef<AppState> for wallet::WalletState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            wallets: Arc::clone(&s.wallets),
        }
    }
}

impl FromRef<AppState> for payments::PaymentState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            settlement: Arc::clone(&s.settlement),
        }
    }
}

impl FromRef<AppState> for health::HealthState {
    fn from_ref(s: &AppState) -> Self {
        Self {
            db: s.db.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

/// Documents the `X-User-Id` header set by the gateway
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "X-User-Id",
                    "Authenticated user id forwarded by the gateway",
                ))),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        charging_points::check_availability,
        charging_points::get_point_status,
        bookings::create_booking,
        bookings::get_booking,
        bookings::check_in,
        bookings::cancel_booking,
        sessions::start_session,
        sessions::stop_session,
        sessions::get_progress,
        wallet::get_wallet,
        wallet::list_transactions,
        wallet::top_up,
        payments::get_session_payment,
        payments::settle_session,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            AvailabilityResult,
            PointStatus,
            charging_points::PointStatusDto,
            BookingStatus,
            bookings::CreateBookingRequest,
            bookings::BookingDto,
            SessionStatus,
            sessions::StartSessionRequest,
            sessions::SessionDto,
            SessionProgress,
            WalletTransactionKind,
            wallet::WalletDto,
            wallet::WalletTransactionDto,
            wallet::TopUpRequest,
            PaymentStatus,
            PaymentMethod,
            payments::PaymentDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service and storage health"),
        (name = "Charging Points", description = "Availability checks and live point status"),
        (name = "Bookings", description = "Reserve a slot, check in, cancel"),
        (name = "Sessions", description = "Start, stop and follow charging sessions"),
        (name = "Wallet", description = "Balance, ledger and top-ups"),
        (name = "Payments", description = "Session payments and settlement"),
    ),
    info(
        title = "EV Charging Hub API",
        version = "1.0.0",
        description = "Reservation, charging and settlement for EV charging points",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes.
///
/// `/metrics` is mounted only when a Prometheus handle is given.
pub fn create_api_router(state: AppState, prometheus: Option<PrometheusHandle>) -> Router {
    let charging_point_routes = Router::new()
        .route(
            "/{point_id}/availability",
            get(charging_points::check_availability),
        )
        .route("/{point_id}/status", get(charging_points::get_point_status));

    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/{booking_id}", get(bookings::get_booking))
        .route("/{booking_id}/check-in", post(bookings::check_in))
        .route("/{booking_id}/cancel", post(bookings::cancel_booking));

    let session_routes = Router::new()
        .route("/", post(sessions::start_session))
        .route("/{session_id}/stop", post(sessions::stop_session))
        .route("/{session_id}/progress", get(sessions::get_progress));

    let wallet_routes = Router::new()
        .route("/", get(wallet::get_wallet))
        .route("/transactions", get(wallet::list_transactions))
        .route("/top-up", post(wallet::top_up));

    let payment_routes = Router::new()
        .route("/session/{session_id}", get(payments::get_session_payment))
        .route("/session/{session_id}/settle", post(payments::settle_session));

    let api = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/charging-points", charging_point_routes)
        .nest("/api/v1/bookings", booking_routes)
        .nest("/api/v1/sessions", session_routes)
        .nest("/api/v1/wallet", wallet_routes)
        .nest("/api/v1/payments", payment_routes)
        .route_layer(middleware::from_fn(
            metrics_module::http_metrics_middleware,
        ))
        .with_state(state);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(api);

    if let Some(handle) = prometheus {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_module::prometheus_metrics))
                .with_state(metrics_module::MetricsState { handle }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::Fixture;
    use crate::interfaces::http::modules::bookings::BookingDto;
    use crate::interfaces::http::modules::payments::PaymentDto;
    use crate::interfaces::http::modules::sessions::SessionDto;
    use crate::interfaces::http::modules::wallet::WalletDto;
    use crate::shared::clock::Clock;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use serde::de::DeserializeOwned;
    use tower::Service;

    fn router(fx: &Fixture) -> Router {
        let clock: SharedClock = Arc::new(fx.clock.clone());
        create_api_router(
            AppState {
                availability: fx.availability.clone(),
                bookings: fx.bookings.clone(),
                sessions: fx.sessions.clone(),
                wallets: fx.wallets.clone(),
                settlement: fx.settlement.clone(),
                clock,
                db: None,
                started_at: Arc::new(Instant::now()),
            },
            None,
        )
    }

    async fn call<T: DeserializeOwned>(
        app: &mut Router,
        method: &str,
        uri: &str,
        user: Option<i32>,
        body: Option<String>,
    ) -> (StatusCode, ApiResponse<T>) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            req = req.header("X-User-Id", user.to_string());
        }
        let req = match body {
            Some(json) => req
                .header("content-type", "application/json")
                .body(Body::from(json))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.call(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_memory_backend() {
        let fx = Fixture::new();
        let mut app = router(&fx);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app.call(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let health: health::HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.storage.backend, "memory");
    }

    #[tokio::test]
    async fn booking_to_settlement_over_http() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.plan(100, 0).await;
        let mut app = router(&fx);

        let (status, wallet) = call::<WalletDto>(
            &mut app,
            "POST",
            "/api/v1/wallet/top-up",
            Some(7),
            Some(r#"{"amount": 70000}"#.into()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wallet.data.unwrap().balance, 70_000);

        let at = fx.clock.now() + Duration::minutes(30);
        let body = serde_json::json!({
            "point_id": 1,
            "vehicle_id": 10,
            "booking_time": at,
            "desired_percentage": 80
        });
        let (status, booking) = call::<BookingDto>(
            &mut app,
            "POST",
            "/api/v1/bookings",
            Some(7),
            Some(body.to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let booking = booking.data.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        fx.clock.set(at);
        let uri = format!("/api/v1/bookings/{}/check-in", booking.id);
        let (status, checked_in) = call::<BookingDto>(&mut app, "POST", &uri, Some(7), None).await;
        assert_eq!(status, StatusCode::OK);
        let checked_in = checked_in.data.unwrap();
        assert_eq!(checked_in.status, BookingStatus::InProgress);
        assert_eq!((checked_in.point_id, checked_in.vehicle_id), (1, 10));

        let body = serde_json::json!({"vehicle_id": 10, "point_id": 1, "target_soc": 80});
        let (status, session) = call::<SessionDto>(
            &mut app,
            "POST",
            "/api/v1/sessions",
            Some(7),
            Some(body.to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let session = session.data.unwrap();
        assert_eq!(session.booking_id, Some(booking.id));

        fx.simulator.tick().await;
        let uri = format!("/api/v1/sessions/{}/stop", session.id);
        let (status, stopped) = call::<SessionDto>(&mut app, "POST", &uri, Some(7), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stopped.data.unwrap().status, SessionStatus::Completed);

        let uri = format!("/api/v1/payments/session/{}/settle", session.id);
        let (status, payment) = call::<PaymentDto>(&mut app, "POST", &uri, Some(7), None).await;
        assert_eq!(status, StatusCode::OK);
        let payment = payment.data.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.outstanding, 0);

        let uri = format!("/api/v1/payments/session/{}", session.id);
        let (status, _) = call::<PaymentDto>(&mut app, "GET", &uri, Some(8), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn domain_errors_become_status_codes() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let mut app = router(&fx);

        let (status, _) =
            call::<serde_json::Value>(&mut app, "GET", "/api/v1/wallet", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            call::<BookingDto>(&mut app, "GET", "/api/v1/bookings/99", Some(7), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call::<WalletDto>(
            &mut app,
            "POST",
            "/api/v1/wallet/top-up",
            Some(7),
            Some(r#"{"amount": 0}"#.into()),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.error.unwrap().contains("amount"));

        fx.fund(7, 10_000).await;
        let body = serde_json::json!({
            "point_id": 1,
            "vehicle_id": 10,
            "booking_time": fx.clock.now() + Duration::hours(1),
        });
        let (status, _) = call::<BookingDto>(
            &mut app,
            "POST",
            "/api/v1/bookings",
            Some(7),
            Some(body.to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn availability_and_status_are_public() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let mut app = router(&fx);

        let at = (fx.clock.now() + Duration::hours(2))
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let uri =
            format!("/api/v1/charging-points/1/availability?requested_time={at}&vehicle_id=10");
        let (status, body) = call::<serde_json::Value>(&mut app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        let result = body.data.unwrap();
        assert_eq!(result["available"], true);
        assert_eq!(result["max_charge_percent"], 100);

        let (status, body) = call::<serde_json::Value>(
            &mut app,
            "GET",
            "/api/v1/charging-points/1/status",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["status"], "AVAILABLE");
    }
}
