//! Server runtime.
//!
//! [`ServerHandle`] owns the whole lifecycle: storage, services, background
//! jobs (session simulator, booking sweeps, status projector, settlement
//! worker), the REST API and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::application::services::{start_booking_expiry_task, start_check_in_timeout_task};
use crate::application::{
    create_event_bus, AvailabilityService, BookingService, ChargingSessionService,
    SessionSimulator, SettlementService, SharedEventBus, StatusProjector, WalletService,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};
use crate::interfaces::{create_api_router, AppState};
use crate::shared::clock::{SharedClock, SystemClock};
use crate::shared::errors::{AppError, InfraError};
use crate::shared::retry::TokioSleeper;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the hub.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running hub.
///
/// ```rust,no_run
/// use evhub::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub event_bus: SharedEventBus,
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Port actually bound (differs from config when it was 0).
    pub api_port: u16,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

/// The global recorder can be installed once per process; a restart in the
/// same process reuses it.
fn prometheus_handle() -> PrometheusHandle {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    PROM_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("Failed to install Prometheus metrics recorder");
            info!("📊 Prometheus metrics recorder installed");
            handle
        })
        .clone()
}

impl ServerHandle {
    /// Start the hub.
    ///
    /// 1. Install the Prometheus recorder
    /// 2. Open storage (SQLite via SeaORM, or the in-memory store) and migrate
    /// 3. Build the services
    /// 4. Start background jobs
    /// 5. Start the REST API (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, AppError> {
        let app_cfg = opts.config;
        info!("Starting EV charging hub...");

        let prometheus = prometheus_handle();

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            if app_cfg.database.is_in_memory() {
                warn!("Using the in-memory store; nothing survives a restart");
                (Arc::new(InMemoryRepositoryProvider::new()), None)
            } else {
                let db_config = DatabaseConfig {
                    url: app_cfg.database.connection_url().to_string(),
                    max_connections: app_cfg.database.max_connections,
                };
                let db = init_database(&db_config).await.map_err(InfraError::from)?;
                if opts.auto_migrate {
                    run_migrations(&db).await.map_err(InfraError::from)?;
                }
                (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
            };

        // ── Services ───────────────────────────────────────────
        let clock: SharedClock = Arc::new(SystemClock);
        let event_bus = create_event_bus();
        info!("🔔 Event bus initialized");

        let policy = app_cfg.booking.clone();
        let wallets = Arc::new(WalletService::new(repos.clone(), clock.clone()));
        let availability = Arc::new(AvailabilityService::new(
            repos.clone(),
            clock.clone(),
            policy,
        ));
        let projector = Arc::new(StatusProjector::new(
            repos.clone(),
            availability.clone(),
            clock.clone(),
        ));
        let bookings = Arc::new(BookingService::new(
            repos.clone(),
            availability.clone(),
            projector.clone(),
            event_bus.clone(),
            clock.clone(),
        ));
        let sessions = Arc::new(ChargingSessionService::new(
            repos.clone(),
            availability.clone(),
            event_bus.clone(),
            clock.clone(),
        ));
        let simulator = Arc::new(SessionSimulator::new(
            repos.clone(),
            sessions.clone(),
            app_cfg.scheduler.simulated_seconds_per_tick,
        ));
        let settlement = Arc::new(SettlementService::new(
            repos.clone(),
            event_bus.clone(),
            clock.clone(),
            app_cfg.settlement.retry_config(),
            Arc::new(TokioSleeper),
        ));

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();
        let scheduler = &app_cfg.scheduler;

        settlement.clone().start_worker(
            shutdown_signal.clone(),
            Duration::from_secs(app_cfg.settlement.sweep_secs.max(1)),
        );
        simulator.start(
            shutdown_signal.clone(),
            Duration::from_millis(scheduler.simulator_tick_ms.max(1)),
        );
        start_booking_expiry_task(
            bookings.clone(),
            clock.clone(),
            shutdown_signal.clone(),
            scheduler.expiry_sweep_secs.max(1),
        );
        start_check_in_timeout_task(
            bookings.clone(),
            clock.clone(),
            shutdown_signal.clone(),
            scheduler.check_in_sweep_secs.max(1),
        );
        projector.start(shutdown_signal.clone(), scheduler.projector_secs.max(1));

        // ── REST API server ────────────────────────────────────
        let router = create_api_router(
            AppState {
                availability,
                bookings,
                sessions,
                wallets,
                settlement,
                clock,
                db: db.clone(),
                started_at: Arc::new(Instant::now()),
            },
            Some(prometheus),
        );

        let api_addr = format!("{}:{}", app_cfg.server.api_host, app_cfg.server.api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr)
            .await
            .map_err(InfraError::from)?;
        let api_port = listener
            .local_addr()
            .map_err(InfraError::from)?
            .port();
        info!("REST API server listening on http://{}:{}", app_cfg.server.api_host, api_port);
        info!("Swagger UI available at http://{}:{}/docs/", app_cfg.server.api_host, api_port);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 EV charging hub started");

        Ok(Self {
            event_bus,
            repos,
            config: app_cfg,
            api_port,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown without waiting.
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait until the API server has stopped, then close the database.
    ///
    /// In-flight requests get `shutdown_timeout` seconds to finish.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        let grace = Duration::from_secs(self.shutdown.timeout_secs());
        let mut api_task = self.api_task;
        tokio::select! {
            result = &mut api_task => match result {
                Ok(()) => info!("REST API server stopped"),
                Err(e) => error!("REST API server task panicked: {}", e),
            },
            _ = async {
                self.shutdown.signal().wait().await;
                tokio::time::sleep(grace).await;
            } => {
                warn!(grace_secs = grace.as_secs(), "REST API server did not stop in time, aborting");
                api_task.abort();
            }
        }

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("✅ Database connection closed");
            }
        }

        info!("👋 EV charging hub shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down EV charging hub...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the `[logging]` section.
///
/// `RUST_LOG` wins over the configured level. Call once at process startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.logging.format.to_lowercase().as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
