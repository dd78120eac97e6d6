//! EV Charging Hub - CLI server
//!
//! ```sh
//! # Run with default config (~/.config/ev-charging-hub/config.toml)
//! evhub
//!
//! # Custom config path
//! evhub --config /etc/evhub/config.toml
//!
//! # Throwaway in-memory instance on another port
//! evhub --memory --api-port 9090
//!
//! # Validate config without starting
//! evhub --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use evhub::config::{AppConfig, IN_MEMORY_DATABASE_URL};
use evhub::server::{init_tracing, ServerHandle, ServerOptions};

/// Booking, charging and settlement backend for EV charging points.
#[derive(Parser, Debug)]
#[command(
    name = "evhub",
    version,
    about = "EV charging reservation and settlement server",
    long_about = "REST API server for booking EV charging points, running \
                  charging sessions and settling them against wallet deposits.\n\n\
                  Default config: ~/.config/ev-charging-hub/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "EVHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Use the in-memory store instead of the configured database.
    #[arg(long)]
    memory: bool,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(evhub::default_config_path);

    let loaded = if config_path.exists() {
        AppConfig::load(&config_path).map(Some)
    } else {
        Ok(None)
    };

    let mut config = match loaded {
        Ok(cfg) => cfg.unwrap_or_default(),
        Err(e) => {
            eprintln!("❌ Invalid configuration in {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.memory {
        config.database.url = IN_MEMORY_DATABASE_URL.to_string();
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}:{}", config.server.api_host, config.server.api_port);
        println!("   Database    : {}", config.database.connection_url());
        println!("   Log level   : {}", config.logging.level);
        println!("   Deposit     : {}", config.booking.deposit_amount);
        return ExitCode::SUCCESS;
    }

    init_tracing(&config);
    if config_path.exists() {
        info!("Configuration loaded from {}", config_path.display());
    } else {
        warn!(
            "No config at {}, using defaults",
            config_path.display()
        );
    }

    // ── Start server ───────────────────────────────────────────
    let handle = match ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    ExitCode::SUCCESS
}
