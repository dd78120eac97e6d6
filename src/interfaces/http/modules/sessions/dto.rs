//! Charging session DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::StartSession;
use crate::domain::{ChargingSession, SessionStatus};

/// Session start request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartSessionRequest {
    pub vehicle_id: i32,
    pub point_id: i32,
    /// Defaults to the vehicle's last known SOC
    #[validate(range(min = 0, max = 100))]
    pub start_soc: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub target_soc: i32,
    /// Checked-in booking to charge under
    pub booking_id: Option<i32>,
}

impl From<StartSessionRequest> for StartSession {
    fn from(req: StartSessionRequest) -> Self {
        StartSession {
            vehicle_id: req.vehicle_id,
            point_id: req.point_id,
            start_soc: req.start_soc,
            target_soc: req.target_soc,
            booking_id: req.booking_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionDto {
    pub id: i32,
    pub driver_id: i32,
    pub vehicle_id: i32,
    pub point_id: i32,
    pub booking_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_soc_percent: i32,
    pub end_soc_percent: i32,
    pub target_soc_percent: i32,
    pub energy_kwh: f64,
    pub duration_min: f64,
    pub cost_total: i64,
    pub status: SessionStatus,
}

impl From<ChargingSession> for SessionDto {
    fn from(s: ChargingSession) -> Self {
        Self {
            id: s.id,
            driver_id: s.driver_id,
            vehicle_id: s.vehicle_id,
            point_id: s.point_id,
            booking_id: s.booking_id,
            start_time: s.start_time,
            end_time: s.end_time,
            start_soc_percent: s.start_soc_percent,
            end_soc_percent: s.end_soc_percent,
            target_soc_percent: s.target_soc_percent,
            energy_kwh: s.energy_kwh,
            duration_min: s.duration_min,
            cost_total: s.cost_total,
            status: s.status,
        }
    }
}
