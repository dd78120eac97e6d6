//! Availability engine
//!
//! Read-side logic over bookings and point status. Answers whether a point
//! can be booked at a given time and what a point's effective status is
//! right now. Nothing in here writes to storage.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::config::BookingPolicy;
use crate::domain::{Booking, DomainError, DomainResult, PointStatus, RepositoryProvider};
use crate::shared::clock::SharedClock;

/// Outcome of an availability check.
///
/// "Unavailable" is a normal answer, carried in `available=false` plus a
/// reason; only malformed input is an error.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AvailabilityResult {
    pub available: bool,
    /// Highest SOC reachable before the next booking (100 if none)
    pub max_charge_percent: i32,
    pub reason: Option<String>,
    /// End of the candidate booking, set when available
    pub estimated_end_time: Option<DateTime<Utc>>,
}

impl AvailabilityResult {
    fn available(max_charge_percent: i32, estimated_end_time: DateTime<Utc>) -> Self {
        Self {
            available: true,
            max_charge_percent,
            reason: None,
            estimated_end_time: Some(estimated_end_time),
        }
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            max_charge_percent: 0,
            reason: Some(reason.into()),
            estimated_end_time: None,
        }
    }
}

/// `[now - lookback, now + lookahead]`: a booking starting in here makes a
/// point display as reserved.
pub fn reservation_window(
    now: DateTime<Utc>,
    policy: &BookingPolicy,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - policy.reserved_lookback(), now + policy.reserved_lookahead())
}

/// Effective status of a point.
///
/// Blocking physical statuses win. Otherwise the point shows as reserved
/// while an active booking starts inside the reservation window, and as its
/// stored status the rest of the time.
pub fn display_status(
    point_status: PointStatus,
    bookings: &[Booking],
    now: DateTime<Utc>,
    policy: &BookingPolicy,
) -> PointStatus {
    if point_status.is_blocking() {
        return point_status;
    }
    let (from, to) = reservation_window(now, policy);
    let held = bookings
        .iter()
        .any(|b| b.is_active() && b.booking_time >= from && b.booking_time <= to);
    if held {
        PointStatus::Reserved
    } else {
        point_status
    }
}

/// Convert fractional hours to a chrono duration (millisecond precision).
pub(crate) fn hours(h: f64) -> Duration {
    Duration::milliseconds((h * 3_600_000.0).round() as i64)
}

pub struct AvailabilityService {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
    policy: BookingPolicy,
}

impl AvailabilityService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        clock: SharedClock,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            repos,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Can `vehicle_id` charge on `point_id` from `requested_time` up to
    /// `desired_percentage` (default 100)?
    pub async fn check_availability(
        &self,
        point_id: i32,
        requested_time: DateTime<Utc>,
        vehicle_id: i32,
        desired_percentage: Option<i32>,
    ) -> DomainResult<AvailabilityResult> {
        let now = self.clock.now();
        if requested_time < now || requested_time >= now + self.policy.horizon() {
            return Err(DomainError::Validation(format!(
                "Requested time must be within the next {} hours",
                self.policy.horizon_hours
            )));
        }

        let point = self
            .repos
            .charging_points()
            .find_by_id(point_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", "id", point_id))?;
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))?;

        let desired = desired_percentage.unwrap_or(100);
        if desired <= vehicle.current_soc_percent || desired > 100 {
            return Err(DomainError::Validation(format!(
                "Desired percentage must be above the current {}% and at most 100",
                vehicle.current_soc_percent
            )));
        }

        if point.status == PointStatus::OutOfService {
            return Ok(AvailabilityResult::unavailable("Charging point is out of service"));
        }

        let power = vehicle.effective_power_kw(point.rated_power_kw);
        if power <= 0.0 || vehicle.battery_capacity_kwh <= 0.0 {
            return Err(DomainError::Validation(
                "Vehicle and charging point have no usable charging power".into(),
            ));
        }

        let buffer = self.policy.buffer();

        // A running session holds the point until its estimated end.
        if let Some(session) = self.repos.sessions().find_active_for_point(point_id).await? {
            let busy_until = match self.repos.vehicles().find_by_id(session.vehicle_id).await? {
                Some(v) => {
                    let session_power = v.effective_power_kw(point.rated_power_kw);
                    let minutes = session.remaining_minutes(session_power, v.battery_capacity_kwh);
                    Some(now + hours(minutes / 60.0 * self.policy.in_progress_margin))
                }
                None => {
                    warn!(
                        session_id = session.id,
                        vehicle_id = session.vehicle_id,
                        "Active session references a missing vehicle"
                    );
                    None
                }
            };
            match busy_until {
                Some(end) if end + buffer <= requested_time => {}
                Some(end) => {
                    return Ok(AvailabilityResult::unavailable(format!(
                        "Charging point is in use until about {}",
                        (end + buffer).format("%H:%M")
                    )));
                }
                None => {
                    return Ok(AvailabilityResult::unavailable("Charging point is in use"));
                }
            }
        }

        let bookings = self.repos.bookings();

        if let Some(prev) = bookings
            .find_latest_active_at_or_before(point_id, requested_time)
            .await?
        {
            if prev.estimated_end_time + buffer > requested_time {
                return Ok(AvailabilityResult::unavailable(format!(
                    "Charging point is booked until {}",
                    (prev.estimated_end_time + buffer).format("%H:%M")
                )));
            }
        }

        let needed_kwh =
            vehicle.energy_between(vehicle.current_soc_percent as f64, desired as f64);
        let charge_time = hours(needed_kwh / power).min(self.policy.max_charge());
        let estimated_end = requested_time + charge_time;

        let overlapping = bookings
            .find_active_for_point_between(point_id, requested_time, estimated_end)
            .await?;
        if !overlapping.is_empty() {
            return Ok(AvailabilityResult::unavailable(
                "Requested slot overlaps an existing booking",
            ));
        }

        let mut max_charge_percent = 100;
        if let Some(next) = bookings.find_next_active_after(point_id, requested_time).await? {
            let slot = next.booking_time - requested_time - buffer;
            if slot < self.policy.min_slot() {
                return Ok(AvailabilityResult::unavailable(format!(
                    "Only {} minutes free before the next booking",
                    slot.num_minutes().max(0)
                )));
            }
            let slot_hours = slot.num_milliseconds() as f64 / 3_600_000.0;
            let reachable = vehicle.current_soc_percent as f64
                + power * slot_hours / vehicle.battery_capacity_kwh * 100.0;
            max_charge_percent = (reachable.floor() as i32).min(100);
        }

        debug!(
            point_id,
            vehicle_id,
            %requested_time,
            %estimated_end,
            max_charge_percent,
            "Slot available"
        );
        Ok(AvailabilityResult::available(max_charge_percent, estimated_end))
    }

    /// Effective status of a point right now. Side-effect free.
    pub async fn calculate_display_status(&self, point_id: i32) -> DomainResult<PointStatus> {
        let point = self
            .repos
            .charging_points()
            .find_by_id(point_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", "id", point_id))?;
        let now = self.clock.now();
        let bookings = self.bookings_in_window(point_id, now).await?;
        Ok(display_status(point.status, &bookings, now, &self.policy))
    }

    /// Active bookings on a point that fall in the reservation window
    pub async fn bookings_in_window(
        &self,
        point_id: i32,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        let (from, to) = reservation_window(now, &self.policy);
        self.repos
            .bookings()
            .find_active_for_point_between(point_id, from, to)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::Fixture;
    use crate::domain::{BookingStatus, ChargingSession};
    use crate::shared::clock::Clock;

    fn booking_at(id: i32, at: DateTime<Utc>, status: BookingStatus) -> Booking {
        let mut b = Booking::new(id, 9, 9, 1, at, at + Duration::minutes(30), 80, 50_000, at);
        b.status = status;
        b
    }

    #[test]
    fn blocking_statuses_are_never_shown_as_reserved() {
        let now = Utc::now();
        let policy = BookingPolicy::default();
        let bookings = vec![booking_at(1, now, BookingStatus::Confirmed)];
        for status in [
            PointStatus::OutOfService,
            PointStatus::Maintenance,
            PointStatus::Charging,
            PointStatus::Occupied,
        ] {
            assert_eq!(display_status(status, &bookings, now, &policy), status);
        }
    }

    #[test]
    fn reserved_only_inside_window_and_for_active_bookings() {
        let now = Utc::now();
        let policy = BookingPolicy::default();
        let at = |m: i64| now + Duration::minutes(m);

        let inside = vec![booking_at(1, at(30), BookingStatus::Confirmed)];
        assert_eq!(
            display_status(PointStatus::Available, &inside, now, &policy),
            PointStatus::Reserved
        );

        let lookback_edge = vec![booking_at(1, at(-10), BookingStatus::InProgress)];
        assert_eq!(
            display_status(PointStatus::Available, &lookback_edge, now, &policy),
            PointStatus::Reserved
        );

        let outside = vec![booking_at(1, at(31), BookingStatus::Confirmed)];
        assert_eq!(
            display_status(PointStatus::Available, &outside, now, &policy),
            PointStatus::Available
        );

        let cancelled = vec![booking_at(1, at(5), BookingStatus::CancelledByUser)];
        assert_eq!(
            display_status(PointStatus::Available, &cancelled, now, &policy),
            PointStatus::Available
        );
    }

    #[tokio::test]
    async fn free_point_gives_full_charge_and_end_estimate() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;

        let requested = fx.clock.now() + Duration::hours(2);
        let result = fx
            .availability
            .check_availability(1, requested, 10, Some(80))
            .await
            .unwrap();

        assert!(result.available);
        assert_eq!(result.max_charge_percent, 100);
        // 24 kWh at 50 kW is 28.8 minutes, no safety margin
        let end = result.estimated_end_time.unwrap();
        assert_eq!((end - requested).num_seconds(), 1728);
    }

    #[tokio::test]
    async fn requests_outside_horizon_are_invalid() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let now = fx.clock.now();

        for t in [now - Duration::minutes(1), now + Duration::hours(24)] {
            assert!(matches!(
                fx.availability.check_availability(1, t, 10, None).await,
                Err(DomainError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn unknown_point_or_vehicle_is_not_found() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let t = fx.clock.now() + Duration::hours(1);

        assert!(matches!(
            fx.availability.check_availability(2, t, 10, None).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            fx.availability.check_availability(1, t, 11, None).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn desired_percentage_must_exceed_current_soc() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 60).await;
        let t = fx.clock.now() + Duration::hours(1);

        assert!(matches!(
            fx.availability.check_availability(1, t, 10, Some(60)).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            fx.availability.check_availability(1, t, 10, Some(101)).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn out_of_service_point_is_unavailable() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.repos
            .charging_points()
            .update_status(1, PointStatus::OutOfService)
            .await
            .unwrap();

        let result = fx
            .availability
            .check_availability(1, fx.clock.now() + Duration::hours(1), 10, None)
            .await
            .unwrap();
        assert!(!result.available);
        assert!(result.reason.is_some());
    }

    #[tokio::test]
    async fn running_session_blocks_with_safety_margin() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.vehicle(20, 8, 60.0, 50.0, 40).await;
        let now = fx.clock.now();
        fx.repos
            .sessions()
            .create(ChargingSession::new(8, 20, 1, None, 40, 80, now))
            .await
            .unwrap();

        // 28.8 min remaining * 1.2 = 34.56 min, plus 15 min buffer
        let blocked = fx
            .availability
            .check_availability(1, now + Duration::minutes(49), 10, Some(50))
            .await
            .unwrap();
        assert!(!blocked.available);

        let free = fx
            .availability
            .check_availability(1, now + Duration::minutes(50), 10, Some(50))
            .await
            .unwrap();
        assert!(free.available);
    }

    #[tokio::test]
    async fn previous_booking_end_plus_buffer_blocks() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let t0 = fx.clock.now() + Duration::hours(1);
        let mut prev = booking_at(1, t0, BookingStatus::Confirmed);
        prev.estimated_end_time = t0 + Duration::minutes(30);
        fx.repos.bookings().save(prev).await.unwrap();

        let blocked = fx
            .availability
            .check_availability(1, t0 + Duration::minutes(44), 10, Some(50))
            .await
            .unwrap();
        assert!(!blocked.available);

        let free = fx
            .availability
            .check_availability(1, t0 + Duration::minutes(45), 10, Some(50))
            .await
            .unwrap();
        assert!(free.available);
    }

    #[tokio::test]
    async fn candidate_overlapping_later_booking_is_unavailable() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let t0 = fx.clock.now() + Duration::hours(1);
        fx.repos
            .bookings()
            .save(booking_at(1, t0 + Duration::minutes(20), BookingStatus::Confirmed))
            .await
            .unwrap();

        // 40 -> 80 needs 28.8 minutes, next booking starts after 20
        let result = fx
            .availability
            .check_availability(1, t0, 10, Some(80))
            .await
            .unwrap();
        assert!(!result.available);
    }

    #[tokio::test]
    async fn next_booking_bounds_max_charge_percent() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let t0 = fx.clock.now() + Duration::hours(1);
        fx.repos
            .bookings()
            .save(booking_at(1, t0 + Duration::minutes(45), BookingStatus::Confirmed))
            .await
            .unwrap();

        // 45 - 15 buffer = 30 min at 50 kW = 25 kWh = 41.6% of 60 kWh
        let result = fx
            .availability
            .check_availability(1, t0, 10, Some(50))
            .await
            .unwrap();
        assert!(result.available);
        assert_eq!(result.max_charge_percent, 81);
    }

    #[tokio::test]
    async fn too_short_slot_before_next_booking_is_unavailable() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let t0 = fx.clock.now() + Duration::hours(1);
        fx.repos
            .bookings()
            .save(booking_at(1, t0 + Duration::minutes(29), BookingStatus::Confirmed))
            .await
            .unwrap();

        // 1% needs 0.72 minutes, but only 14 minutes remain after the buffer
        let result = fx
            .availability
            .check_availability(1, t0, 10, Some(41))
            .await
            .unwrap();
        assert!(!result.available);
    }

    #[tokio::test]
    async fn display_status_reads_bookings_without_mutating_point() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        let now = fx.clock.now();
        fx.repos
            .bookings()
            .save(booking_at(1, now + Duration::minutes(20), BookingStatus::Confirmed))
            .await
            .unwrap();

        let shown = fx.availability.calculate_display_status(1).await.unwrap();
        assert_eq!(shown, PointStatus::Reserved);

        let stored = fx.repos.charging_points().find_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.status, PointStatus::Available);
    }
}
