//! Charging point domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Physical status stored on a charging point.
///
/// `Reserved` here is only a cached projection; the effective status is
/// computed by the availability engine from bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointStatus {
    Available,
    Reserved,
    Charging,
    Occupied,
    OutOfService,
    Maintenance,
}

impl PointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Reserved => "RESERVED",
            Self::Charging => "CHARGING",
            Self::Occupied => "OCCUPIED",
            Self::OutOfService => "OUT_OF_SERVICE",
            Self::Maintenance => "MAINTENANCE",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "AVAILABLE" => Self::Available,
            "RESERVED" => Self::Reserved,
            "CHARGING" => Self::Charging,
            "OCCUPIED" => Self::Occupied,
            "MAINTENANCE" => Self::Maintenance,
            _ => Self::OutOfService,
        }
    }

    /// Statuses that a time-windowed reservation never overrides.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Self::OutOfService | Self::Maintenance | Self::Charging | Self::Occupied
        )
    }
}

impl Default for PointStatus {
    fn default() -> Self {
        Self::Available
    }
}

impl std::fmt::Display for PointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Charging point (one plug on a station)
#[derive(Debug, Clone)]
pub struct ChargingPoint {
    pub id: i32,
    /// Owning station
    pub station_id: i32,
    pub name: String,
    /// Rated output power in kW
    pub rated_power_kw: f64,
    pub status: PointStatus,
    /// Session currently holding the point
    pub current_session_id: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl ChargingPoint {
    pub fn new(id: i32, station_id: i32, name: impl Into<String>, rated_power_kw: f64) -> Self {
        Self {
            id,
            station_id,
            name: name.into(),
            rated_power_kw,
            status: PointStatus::Available,
            current_session_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn has_active_session(&self) -> bool {
        self.current_session_id.is_some()
    }

    /// Occupy the point with a running session.
    pub fn occupy(&mut self, session_id: i32) {
        self.status = PointStatus::Charging;
        self.current_session_id = Some(session_id);
        self.updated_at = Utc::now();
    }

    /// Release the point after its session finished.
    pub fn release(&mut self) {
        self.status = PointStatus::Available;
        self.current_session_id = None;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupy_and_release() {
        let mut p = ChargingPoint::new(1, 10, "P1", 22.0);
        p.occupy(5);
        assert_eq!(p.status, PointStatus::Charging);
        assert_eq!(p.current_session_id, Some(5));
        p.release();
        assert_eq!(p.status, PointStatus::Available);
        assert!(!p.has_active_session());
    }

    #[test]
    fn blocking_statuses() {
        assert!(PointStatus::OutOfService.is_blocking());
        assert!(PointStatus::Maintenance.is_blocking());
        assert!(PointStatus::Charging.is_blocking());
        assert!(PointStatus::Occupied.is_blocking());
        assert!(!PointStatus::Available.is_blocking());
        assert!(!PointStatus::Reserved.is_blocking());
    }

    #[test]
    fn unknown_status_is_out_of_service() {
        assert_eq!(PointStatus::from_str("BROKEN"), PointStatus::OutOfService);
        assert_eq!(PointStatus::from_str("RESERVED"), PointStatus::Reserved);
    }
}
