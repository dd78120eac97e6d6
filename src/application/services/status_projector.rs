//! Point status projector
//!
//! Keeps the stored point status in line with the availability engine's
//! reservation window, for consumers that read the raw column. The pure
//! [`display_status`](super::availability::display_status) stays the source
//! of truth; this is a cache that is refreshed every few minutes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::availability::AvailabilityService;
use crate::domain::{ChargingPoint, DomainError, DomainResult, PointStatus, RepositoryProvider};
use crate::shared::clock::SharedClock;
use crate::shared::shutdown::ShutdownSignal;

/// Points changed by one projection pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionReport {
    pub reserved: usize,
    pub released: usize,
}

pub struct StatusProjector {
    repos: Arc<dyn RepositoryProvider>,
    availability: Arc<AvailabilityService>,
    clock: SharedClock,
}

impl StatusProjector {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        availability: Arc<AvailabilityService>,
        clock: SharedClock,
    ) -> Self {
        Self {
            repos,
            availability,
            clock,
        }
    }

    /// One projection pass at `now`.
    ///
    /// Flags available, idle points whose booking starts within the lead
    /// time, then releases reserved points no booking holds any more.
    /// Failures on a single point are logged and skipped.
    pub async fn project(&self, now: DateTime<Utc>) -> DomainResult<ProjectionReport> {
        let mut report = ProjectionReport::default();
        let lead = self.availability.policy().projector_lead();

        let upcoming = self
            .repos
            .bookings()
            .find_active_starting_between(now, now + lead)
            .await?;
        for booking in upcoming {
            match self.reserve_if_idle(booking.point_id).await {
                Ok(true) => report.reserved += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    booking_id = booking.id,
                    point_id = booking.point_id,
                    error = %e,
                    "Failed to reserve point"
                ),
            }
        }

        let reserved = self
            .repos
            .charging_points()
            .find_by_status(PointStatus::Reserved)
            .await?;
        for point in reserved {
            let point_id = point.id;
            match self.release_if_unheld(point, now).await {
                Ok(true) => report.released += 1,
                Ok(false) => {}
                Err(e) => warn!(point_id, error = %e, "Failed to release point"),
            }
        }

        if report != ProjectionReport::default() {
            info!(
                reserved = report.reserved,
                released = report.released,
                "Point status projection applied"
            );
        }
        Ok(report)
    }

    /// Release a single reserved point if nothing holds it any more.
    ///
    /// Returns the point's stored status afterwards.
    pub async fn reconcile_point(&self, point_id: i32) -> DomainResult<PointStatus> {
        let point = self
            .repos
            .charging_points()
            .find_by_id(point_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", "id", point_id))?;
        if point.status != PointStatus::Reserved {
            return Ok(point.status);
        }
        if self.release_if_unheld(point, self.clock.now()).await? {
            Ok(PointStatus::Available)
        } else {
            Ok(PointStatus::Reserved)
        }
    }

    async fn is_idle(&self, point: &ChargingPoint) -> DomainResult<bool> {
        if point.has_active_session() {
            return Ok(false);
        }
        Ok(self
            .repos
            .sessions()
            .find_active_for_point(point.id)
            .await?
            .is_none())
    }

    async fn reserve_if_idle(&self, point_id: i32) -> DomainResult<bool> {
        let Some(point) = self.repos.charging_points().find_by_id(point_id).await? else {
            return Err(DomainError::not_found("ChargingPoint", "id", point_id));
        };
        if point.status != PointStatus::Available || !self.is_idle(&point).await? {
            return Ok(false);
        }
        self.repos
            .charging_points()
            .update_status(point_id, PointStatus::Reserved)
            .await?;
        debug!(point_id, "Point reserved ahead of booking");
        Ok(true)
    }

    async fn release_if_unheld(&self, point: ChargingPoint, now: DateTime<Utc>) -> DomainResult<bool> {
        if point.status != PointStatus::Reserved || !self.is_idle(&point).await? {
            return Ok(false);
        }
        let holding = self.availability.bookings_in_window(point.id, now).await?;
        if !holding.is_empty() {
            return Ok(false);
        }
        self.repos
            .charging_points()
            .update_status(point.id, PointStatus::Available)
            .await?;
        debug!(point_id = point.id, "Reservation lapsed, point available");
        Ok(true)
    }

    /// Run [`project`](Self::project) every `interval_secs` until shutdown.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal, interval_secs: u64) {
        tokio::spawn(async move {
            info!(interval = interval_secs, "🅿️ Point status projector started");

            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.project(self.clock.now()).await {
                            warn!(error = %e, "Point status projection error");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("🅿️ Point status projector shutting down");
                        break;
                    }
                }
            }

            info!("🅿️ Point status projector stopped");
        });
    }
}
