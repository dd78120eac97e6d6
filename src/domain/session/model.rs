//! Charging session domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "IN_PROGRESS" => Self::InProgress,
            _ => Self::Completed,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Charging session
///
/// All progress lives here: a restarted simulator resumes from the persisted
/// energy and duration.
#[derive(Debug, Clone)]
pub struct ChargingSession {
    pub id: i32,
    pub driver_id: i32,
    pub vehicle_id: i32,
    pub point_id: i32,
    /// Booking the session was started from
    pub booking_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_soc_percent: i32,
    /// Current SOC while running, final SOC once completed
    pub end_soc_percent: i32,
    pub target_soc_percent: i32,
    /// Energy delivered so far (kWh)
    pub energy_kwh: f64,
    /// Charging time so far (minutes)
    pub duration_min: f64,
    pub cost_total: i64,
    pub status: SessionStatus,
}

impl ChargingSession {
    pub fn new(
        driver_id: i32,
        vehicle_id: i32,
        point_id: i32,
        booking_id: Option<i32>,
        start_soc_percent: i32,
        target_soc_percent: i32,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            driver_id,
            vehicle_id,
            point_id,
            booking_id,
            start_time,
            end_time: None,
            start_soc_percent,
            end_soc_percent: start_soc_percent,
            target_soc_percent,
            energy_kwh: 0.0,
            duration_min: 0.0,
            cost_total: 0,
            status: SessionStatus::InProgress,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    /// Unrounded SOC implied by the energy delivered so far.
    pub fn exact_soc(&self, battery_capacity_kwh: f64) -> f64 {
        if battery_capacity_kwh <= 0.0 {
            return self.start_soc_percent as f64;
        }
        self.start_soc_percent as f64 + self.energy_kwh / battery_capacity_kwh * 100.0
    }

    /// Advance by one slice of charging at `power_kw` for `seconds`.
    ///
    /// Returns `true` once the target SOC is reached; SOC is clamped to the
    /// target. Energy, duration and SOC never decrease.
    pub fn advance(&mut self, power_kw: f64, seconds: f64, battery_capacity_kwh: f64) -> bool {
        let energy = power_kw.max(0.0) * (seconds / 3600.0);
        self.energy_kwh += energy;
        self.duration_min += seconds / 60.0;

        let rounded = self.exact_soc(battery_capacity_kwh).round() as i32;
        if rounded >= self.target_soc_percent {
            self.end_soc_percent = self.target_soc_percent;
            true
        } else {
            self.end_soc_percent = self.end_soc_percent.max(rounded);
            false
        }
    }

    /// Mark finished with the final cost.
    pub fn complete(&mut self, at: DateTime<Utc>, cost_total: i64) {
        self.status = SessionStatus::Completed;
        self.end_time = Some(at);
        self.cost_total = cost_total;
    }

    /// Minutes left at `power_kw`, from the current SOC to target.
    pub fn remaining_minutes(&self, power_kw: f64, battery_capacity_kwh: f64) -> f64 {
        if power_kw <= 0.0 || !self.is_active() {
            return 0.0;
        }
        let remaining_soc =
            (self.target_soc_percent as f64 - self.exact_soc(battery_capacity_kwh)).max(0.0);
        remaining_soc / 100.0 * battery_capacity_kwh / power_kw * 60.0
    }
}
