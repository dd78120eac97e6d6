//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/ev-charging-hub/config.toml`).
//! Every section and key is optional; missing values fall back to defaults.
//!
//! ```toml
//! [server]
//! api_port = 8080
//!
//! [database]
//! url = "sqlite://./evhub.db?mode=rwc"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [booking]
//! deposit_amount = 50000
//!
//! [scheduler]
//! simulator_tick_ms = 1000
//! simulated_seconds_per_tick = 6.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::errors::InfraError;
use crate::shared::retry::RetryConfig;

/// Database URL that selects the DashMap-backed store instead of SeaORM
pub const IN_MEMORY_DATABASE_URL: &str = "memory";

/// Default config location: `~/.config/ev-charging-hub/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ev-charging-hub")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub logging: LoggingConfig,
    pub booking: BookingPolicy,
    pub scheduler: SchedulerConfig,
    pub settlement: SettlementConfig,
}

impl AppConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, InfraError> {
        let config: AppConfig =
            toml::from_str(raw).map_err(|e| InfraError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), InfraError> {
        let b = &self.booking;
        if b.deposit_amount < 0 {
            return Err(InfraError::Config("booking.deposit_amount must be >= 0".into()));
        }
        if !(0..=100).contains(&b.timeout_refund_percent) {
            return Err(InfraError::Config(
                "booking.timeout_refund_percent must be within 0..=100".into(),
            ));
        }
        if self.scheduler.simulator_tick_ms == 0 {
            return Err(InfraError::Config("scheduler.simulator_tick_ms must be > 0".into()));
        }
        if self.settlement.max_attempts == 0 {
            return Err(InfraError::Config("settlement.max_attempts must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for background tasks on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SeaORM connection URL, or `"memory"` for the in-memory store
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./evhub.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseSection {
    pub fn connection_url(&self) -> &str {
        &self.url
    }

    pub fn is_in_memory(&self) -> bool {
        self.url == IN_MEMORY_DATABASE_URL
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Booking and availability rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingPolicy {
    /// Held from the wallet when a booking is confirmed
    pub deposit_amount: i64,
    /// Gap kept between consecutive uses of a point
    pub buffer_minutes: i64,
    /// Shortest slot that can still be booked before the next booking
    pub min_slot_minutes: i64,
    /// How far ahead a booking may be placed
    pub horizon_hours: i64,
    /// Upper bound on a booking's estimated charging time
    pub max_charge_hours: i64,
    /// Multiplier on a running session's remaining time (charge-curve taper)
    pub in_progress_margin: f64,
    /// Check-in is allowed this many minutes either side of `booking_time`
    pub check_in_window_minutes: i64,
    /// A checked-in booking without a session expires after this long
    pub check_in_timeout_minutes: i64,
    /// Share of the deposit returned on a check-in timeout
    pub timeout_refund_percent: i64,
    /// Display status looks this far back for a reserving booking
    pub reserved_lookback_minutes: i64,
    /// Display status looks this far ahead for a reserving booking
    pub reserved_lookahead_minutes: i64,
    /// The projector flags points this long before a booking starts
    pub projector_lead_minutes: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            deposit_amount: 50_000,
            buffer_minutes: 15,
            min_slot_minutes: 15,
            horizon_hours: 24,
            max_charge_hours: 12,
            in_progress_margin: 1.2,
            check_in_window_minutes: 15,
            check_in_timeout_minutes: 10,
            timeout_refund_percent: 50,
            reserved_lookback_minutes: 10,
            reserved_lookahead_minutes: 30,
            projector_lead_minutes: 15,
        }
    }
}

impl BookingPolicy {
    pub fn buffer(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.buffer_minutes)
    }

    pub fn min_slot(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.min_slot_minutes)
    }

    pub fn horizon(&self) -> chrono::Duration {
        chrono::Duration::hours(self.horizon_hours)
    }

    pub fn max_charge(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_charge_hours)
    }

    pub fn check_in_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.check_in_window_minutes)
    }

    pub fn check_in_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.check_in_timeout_minutes)
    }

    pub fn reserved_lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reserved_lookback_minutes)
    }

    pub fn reserved_lookahead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reserved_lookahead_minutes)
    }

    pub fn projector_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.projector_lead_minutes)
    }

    /// Deposit share returned after a check-in timeout
    pub fn timeout_refund(&self, deposit: i64) -> i64 {
        deposit * self.timeout_refund_percent / 100
    }
}

/// Background task cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub expiry_sweep_secs: u64,
    pub projector_secs: u64,
    pub check_in_sweep_secs: u64,
    /// Real time between simulator ticks
    pub simulator_tick_ms: u64,
    /// Charging time simulated by one tick
    pub simulated_seconds_per_tick: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_secs: 300,
            projector_secs: 300,
            check_in_sweep_secs: 120,
            simulator_tick_ms: 1000,
            simulated_seconds_per_tick: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    /// Interval of the sweep that settles completions the worker never saw
    pub sweep_secs: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
            sweep_secs: 60,
        }
    }
}

impl SettlementConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}
