//! Charging session lifecycle
//!
//! Starting, stopping and reporting on sessions. Completion is shared with
//! the simulator so that a driver's early stop and a session reaching its
//! target go through the same steps.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::availability::{display_status, AvailabilityService};
use crate::application::events::{Event, SessionCompletedEvent, SharedEventBus};
use crate::domain::{
    Booking, BookingStatus, ChargingPoint, ChargingSession, DomainError, DomainResult, Payment,
    PointStatus, RepositoryProvider, SessionStatus,
};
use crate::shared::clock::SharedClock;

/// Session start request
#[derive(Debug, Clone)]
pub struct StartSession {
    pub vehicle_id: i32,
    pub point_id: i32,
    /// Defaults to the vehicle's last known SOC
    pub start_soc: Option<i32>,
    pub target_soc: i32,
    /// Checked-in booking the session belongs to
    pub booking_id: Option<i32>,
}

/// Live view of a session
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionProgress {
    pub session_id: i32,
    pub status: SessionStatus,
    pub point_id: i32,
    pub booking_id: Option<i32>,
    pub start_soc_percent: i32,
    pub current_soc_percent: i32,
    pub target_soc_percent: i32,
    pub energy_kwh: f64,
    pub duration_min: f64,
    /// Cost under the active billing plan so far (final cost once completed)
    pub cost_so_far: i64,
    pub remaining_minutes: f64,
}

pub struct ChargingSessionService {
    repos: Arc<dyn RepositoryProvider>,
    availability: Arc<AvailabilityService>,
    event_bus: SharedEventBus,
    clock: SharedClock,
}

impl ChargingSessionService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        availability: Arc<AvailabilityService>,
        event_bus: SharedEventBus,
        clock: SharedClock,
    ) -> Self {
        Self {
            repos,
            availability,
            event_bus,
            clock,
        }
    }

    pub async fn start_session(
        &self,
        driver_id: i32,
        req: StartSession,
    ) -> DomainResult<ChargingSession> {
        let mut point = self.find_point(req.point_id).await?;
        match point.status {
            PointStatus::OutOfService | PointStatus::Maintenance => {
                return Err(DomainError::Conflict(format!(
                    "Charging point {} is {}",
                    point.id, point.status
                )));
            }
            PointStatus::Charging | PointStatus::Occupied => {
                return Err(DomainError::Conflict(format!(
                    "Charging point {} is in use",
                    point.id
                )));
            }
            PointStatus::Available | PointStatus::Reserved => {}
        }
        if point.has_active_session()
            || self
                .repos
                .sessions()
                .find_active_for_point(point.id)
                .await?
                .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "Charging point {} already has an active session",
                point.id
            )));
        }

        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(req.vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", req.vehicle_id))?;
        if vehicle.owner_id != driver_id {
            return Err(DomainError::Forbidden(format!(
                "Vehicle {} does not belong to user {}",
                vehicle.id, driver_id
            )));
        }

        let booking_id = match req.booking_id {
            Some(id) => Some(self.own_booking(driver_id, id, point.id).await?.id),
            None => self.holding_booking(driver_id, &point).await?,
        };

        let start_soc = req.start_soc.unwrap_or(vehicle.current_soc_percent);
        if !(0..=100).contains(&start_soc) || start_soc >= req.target_soc || req.target_soc > 100 {
            return Err(DomainError::Validation(format!(
                "Need 0 <= start_soc < target_soc <= 100, got {} and {}",
                start_soc, req.target_soc
            )));
        }

        let now = self.clock.now();
        let session = self
            .repos
            .sessions()
            .create(ChargingSession::new(
                driver_id,
                vehicle.id,
                point.id,
                booking_id,
                start_soc,
                req.target_soc,
                now,
            ))
            .await?;

        point.occupy(session.id);
        self.repos.charging_points().update(point).await?;

        info!(
            session_id = session.id,
            driver_id,
            point_id = session.point_id,
            booking_id = ?session.booking_id,
            start_soc,
            target_soc = req.target_soc,
            "Charging session started"
        );
        Ok(session)
    }

    /// End a running session early.
    pub async fn stop_session(
        &self,
        driver_id: i32,
        session_id: i32,
    ) -> DomainResult<ChargingSession> {
        let session = self.own_session(driver_id, session_id).await?;
        if !session.is_active() {
            return Err(DomainError::Conflict(format!(
                "Session {session_id} is already completed"
            )));
        }
        info!(session_id, driver_id, "Session stopped by driver");
        self.complete(session).await
    }

    pub async fn progress(&self, driver_id: i32, session_id: i32) -> DomainResult<SessionProgress> {
        let session = self.own_session(driver_id, session_id).await?;

        let (cost_so_far, remaining_minutes) = if session.is_active() {
            let point = self.find_point(session.point_id).await?;
            let capacity = self
                .repos
                .vehicles()
                .find_by_id(session.vehicle_id)
                .await?
                .map(|v| v.battery_capacity_kwh)
                .unwrap_or(0.0);
            let cost = self
                .repos
                .billing_plans()
                .find_active()
                .await?
                .map(|plan| plan.calculate_cost(session.energy_kwh, session.duration_min))
                .unwrap_or(0);
            (cost, session.remaining_minutes(point.rated_power_kw, capacity))
        } else {
            (session.cost_total, 0.0)
        };

        Ok(SessionProgress {
            session_id: session.id,
            status: session.status,
            point_id: session.point_id,
            booking_id: session.booking_id,
            start_soc_percent: session.start_soc_percent,
            current_soc_percent: session.end_soc_percent,
            target_soc_percent: session.target_soc_percent,
            energy_kwh: session.energy_kwh,
            duration_min: session.duration_min,
            cost_so_far,
            remaining_minutes,
        })
    }

    /// Finish a session: price it, free the point, record the vehicle's SOC
    /// and open the payment.
    ///
    /// Writing the completed session is the committing step and only
    /// succeeds while the stored session is still running, so a stop racing
    /// the simulator completes it once. The loser gets a conflict. Follow-up
    /// writes are logged on failure and left for settlement to repair.
    pub(crate) async fn complete(&self, mut session: ChargingSession) -> DomainResult<ChargingSession> {
        let now = self.clock.now();

        let cost = match self.repos.billing_plans().find_active().await? {
            Some(plan) => plan.calculate_cost(session.energy_kwh, session.duration_min),
            None => {
                warn!(
                    session_id = session.id,
                    "No active billing plan, session priced at 0"
                );
                0
            }
        };

        session.complete(now, cost);
        if !self.repos.sessions().update_in_progress(session.clone()).await? {
            return Err(DomainError::Conflict(format!(
                "Session {} is already completed",
                session.id
            )));
        }

        if let Err(e) = self.release_point(&session).await {
            warn!(session_id = session.id, point_id = session.point_id, error = %e, "Failed to release point");
        }
        if let Err(e) = self
            .repos
            .vehicles()
            .update_soc(session.vehicle_id, session.end_soc_percent)
            .await
        {
            warn!(session_id = session.id, vehicle_id = session.vehicle_id, error = %e, "Failed to update vehicle SOC");
        }
        match self
            .repos
            .payments()
            .create(Payment::unpaid(session.driver_id, session.id, cost, now))
            .await
        {
            Ok(_) | Err(DomainError::Conflict(_)) => {}
            Err(e) => warn!(session_id = session.id, error = %e, "Failed to open payment"),
        }

        metrics::counter!("sessions_completed_total").increment(1);
        info!(
            session_id = session.id,
            point_id = session.point_id,
            energy_kwh = session.energy_kwh,
            duration_min = session.duration_min,
            end_soc = session.end_soc_percent,
            cost,
            "Charging session completed"
        );

        self.event_bus.publish(Event::SessionCompleted(SessionCompletedEvent {
            session_id: session.id,
            driver_id: session.driver_id,
            point_id: session.point_id,
            booking_id: session.booking_id,
            cost_total: cost,
            timestamp: now,
        }));
        Ok(session)
    }

    async fn release_point(&self, session: &ChargingSession) -> DomainResult<()> {
        let mut point = self.find_point(session.point_id).await?;
        if point.current_session_id == Some(session.id) || point.status == PointStatus::Charging {
            point.release();
            self.repos.charging_points().update(point).await?;
        }
        Ok(())
    }

    async fn find_point(&self, point_id: i32) -> DomainResult<ChargingPoint> {
        self.repos
            .charging_points()
            .find_by_id(point_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", "id", point_id))
    }

    async fn own_session(&self, driver_id: i32, session_id: i32) -> DomainResult<ChargingSession> {
        let session = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", "id", session_id))?;
        if session.driver_id != driver_id {
            return Err(DomainError::Forbidden(format!(
                "Session {session_id} belongs to another driver"
            )));
        }
        Ok(session)
    }

    /// The driver's checked-in booking on this point, not yet used by a session.
    async fn own_booking(&self, driver_id: i32, booking_id: i32, point_id: i32) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))?;
        if booking.user_id != driver_id {
            return Err(DomainError::Forbidden(format!(
                "Booking {booking_id} belongs to another user"
            )));
        }
        if booking.point_id != point_id {
            return Err(DomainError::Conflict(format!(
                "Booking {booking_id} is for charging point {}",
                booking.point_id
            )));
        }
        if booking.status != BookingStatus::InProgress {
            return Err(DomainError::Conflict(format!(
                "Booking {} must be checked in, status is {}",
                booking_id, booking.status
            )));
        }
        if self.repos.sessions().find_by_booking(booking_id).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "Booking {booking_id} already has a session"
            )));
        }
        Ok(booking)
    }

    /// Booking to attach when none was given.
    ///
    /// A point shown as reserved only admits the driver holding the
    /// reservation, and only once checked in. A checked-in booking of the
    /// driver on this point is adopted either way.
    async fn holding_booking(&self, driver_id: i32, point: &ChargingPoint) -> DomainResult<Option<i32>> {
        let now = self.clock.now();
        let in_window = self.availability.bookings_in_window(point.id, now).await?;
        let shown = display_status(point.status, &in_window, now, self.availability.policy());

        let checked_in = match self
            .repos
            .bookings()
            .find_in_progress_for_user_and_point(driver_id, point.id)
            .await?
        {
            Some(b) if self.repos.sessions().find_by_booking(b.id).await?.is_none() => Some(b.id),
            _ => None,
        };

        if shown == PointStatus::Reserved && checked_in.is_none() {
            return match in_window.iter().find(|b| b.user_id == driver_id) {
                Some(b) => Err(DomainError::Conflict(format!(
                    "Check in to booking {} before starting",
                    b.id
                ))),
                None => Err(DomainError::Conflict(format!(
                    "Charging point {} is reserved for another driver",
                    point.id
                ))),
            };
        }
        Ok(checked_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::booking::NewBooking;
    use crate::application::services::test_support::Fixture;
    use crate::domain::PaymentStatus;
    use crate::shared::clock::Clock;
    use chrono::Duration;

    fn start(vehicle_id: i32, point_id: i32, target: i32) -> StartSession {
        StartSession {
            vehicle_id,
            point_id,
            start_soc: None,
            target_soc: target,
            booking_id: None,
        }
    }

    #[tokio::test]
    async fn start_occupies_point() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;

        let session = fx.sessions.start_session(7, start(10, 1, 80)).await.unwrap();
        assert_eq!(session.start_soc_percent, 40);
        assert_eq!(session.status, SessionStatus::InProgress);

        let point = fx.repos.charging_points().find_by_id(1).await.unwrap().unwrap();
        assert_eq!(point.status, PointStatus::Charging);
        assert_eq!(point.current_session_id, Some(session.id));

        fx.vehicle(20, 8, 60.0, 50.0, 40).await;
        assert!(matches!(
            fx.sessions.start_session(8, start(20, 1, 80)).await,
            Err(DomainError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn blocked_point_and_bad_soc_are_rejected() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.point(2, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.repos
            .charging_points()
            .update_status(1, PointStatus::Maintenance)
            .await
            .unwrap();

        assert!(matches!(
            fx.sessions.start_session(7, start(10, 1, 80)).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            fx.sessions.start_session(7, start(10, 2, 40)).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            fx.sessions.start_session(8, start(10, 2, 80)).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn reserved_point_only_admits_checked_in_holder() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.vehicle(20, 8, 60.0, 50.0, 40).await;
        fx.fund(7, 100_000).await;
        let at = fx.clock.now() + Duration::minutes(20);
        let booking = fx
            .bookings
            .create_booking(
                7,
                NewBooking {
                    point_id: 1,
                    vehicle_id: 10,
                    booking_time: at,
                    desired_percentage: Some(80),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            fx.sessions.start_session(8, start(20, 1, 80)).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            fx.sessions.start_session(7, start(10, 1, 80)).await,
            Err(DomainError::Conflict(_))
        ));

        fx.clock.set(at);
        fx.bookings.check_in_booking(7, booking.id).await.unwrap();
        let session = fx.sessions.start_session(7, start(10, 1, 80)).await.unwrap();
        assert_eq!(session.booking_id, Some(booking.id));
    }

    #[tokio::test]
    async fn explicit_booking_must_be_checked_in_on_same_point() {
        let fx = Fixture::new();
        fx.point(1, 50.0).await;
        fx.point(2, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.fund(7, 100_000).await;
        let at = fx.clock.now() + Duration::minutes(20);
        let booking = fx
            .bookings
            .create_booking(
                7,
                NewBooking {
                    point_id: 1,
                    vehicle_id: 10,
                    booking_time: at,
                    desired_percentage: Some(80),
                },
            )
            .await
            .unwrap();
        let with_booking = |point_id| StartSession {
            booking_id: Some(booking.id),
            ..start(10, point_id, 80)
        };

        assert!(matches!(
            fx.sessions.start_session(7, with_booking(1)).await,
            Err(DomainError::Conflict(_))
        ));
        fx.clock.set(at);
        fx.bookings.check_in_booking(7, booking.id).await.unwrap();
        assert!(matches!(
            fx.sessions.start_session(7, with_booking(2)).await,
            Err(DomainError::Conflict(_))
        ));
        fx.sessions.start_session(7, with_booking(1)).await.unwrap();
    }

    #[tokio::test]
    async fn stop_completes_and_opens_payment() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.plan(3_000, 100).await;
        let mut events = fx.bus.subscribe();

        let session = fx.sessions.start_session(7, start(10, 1, 80)).await.unwrap();
        for _ in 0..10 {
            fx.simulator.tick().await.unwrap();
        }
        let progress = fx.sessions.progress(7, session.id).await.unwrap();
        assert!(progress.energy_kwh > 0.36);
        assert!(progress.cost_so_far > 0);
        assert!(progress.remaining_minutes > 0.0);

        let done = fx.sessions.stop_session(7, session.id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.end_soc_percent, 41);

        let payment = fx
            .repos
            .payments()
            .find_by_session(session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Unpaid);
        assert_eq!(payment.amount, done.cost_total);

        let point = fx.repos.charging_points().find_by_id(1).await.unwrap().unwrap();
        assert_eq!(point.status, PointStatus::Available);
        let vehicle = fx.repos.vehicles().find_by_id(10).await.unwrap().unwrap();
        assert_eq!(vehicle.current_soc_percent, 41);

        let msg = events.recv().await.unwrap();
        assert_eq!(msg.event.event_type(), "session_completed");

        assert!(matches!(
            fx.sessions.stop_session(7, session.id).await,
            Err(DomainError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn missing_plan_prices_session_at_zero() {
        let fx = Fixture::new();
        fx.point(1, 22.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        let session = fx.sessions.start_session(7, start(10, 1, 80)).await.unwrap();
        fx.simulator.tick().await.unwrap();

        let done = fx.sessions.stop_session(7, session.id).await.unwrap();
        assert_eq!(done.cost_total, 0);
    }
}
