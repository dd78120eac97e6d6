//! Session simulator
//!
//! Stands in for real charger telemetry: every tick advances each running
//! session by a fixed slice of simulated time at the point's rated power.
//! Nothing is kept between ticks; progress is read from and written to the
//! stored session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::charging_session::ChargingSessionService;
use crate::domain::{ChargingSession, DomainError, DomainResult, RepositoryProvider};
use crate::shared::shutdown::ShutdownSignal;

/// What one tick did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub advanced: usize,
    pub completed: usize,
    /// Sessions that finished elsewhere (driver stop) while being advanced
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Charging,
    Completed,
    AlreadyFinished,
}

pub struct SessionSimulator {
    repos: Arc<dyn RepositoryProvider>,
    sessions: Arc<ChargingSessionService>,
    simulated_seconds: f64,
}

impl SessionSimulator {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        sessions: Arc<ChargingSessionService>,
        simulated_seconds: f64,
    ) -> Self {
        Self {
            repos,
            sessions,
            simulated_seconds,
        }
    }

    /// Advance every in-progress session once.
    pub async fn tick(&self) -> DomainResult<TickReport> {
        let running = self.repos.sessions().find_in_progress().await?;
        let mut report = TickReport::default();

        for session in running {
            let session_id = session.id;
            match self.advance(session).await {
                Ok(Step::Charging) => report.advanced += 1,
                Ok(Step::Completed) => report.completed += 1,
                Ok(Step::AlreadyFinished) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("simulator_tick_errors_total").increment(1);
                    warn!(session_id, error = %e, "Simulator tick failed for session");
                }
            }
        }

        if report.completed > 0 || report.skipped > 0 {
            debug!(
                advanced = report.advanced,
                completed = report.completed,
                skipped = report.skipped,
                failed = report.failed,
                "Simulator tick"
            );
        }
        Ok(report)
    }

    /// `session` is a snapshot; every write back is conditional on the
    /// stored session still running.
    async fn advance(&self, mut session: ChargingSession) -> DomainResult<Step> {
        let point = self
            .repos
            .charging_points()
            .find_by_id(session.point_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", "id", session.point_id))?;
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(session.vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", session.vehicle_id))?;

        let previous_soc = session.end_soc_percent;
        let reached = session.advance(
            point.rated_power_kw,
            self.simulated_seconds,
            vehicle.battery_capacity_kwh,
        );

        if reached {
            return match self.sessions.complete(session).await {
                Ok(_) => Ok(Step::Completed),
                Err(DomainError::Conflict(_)) => Ok(Step::AlreadyFinished),
                Err(e) => Err(e),
            };
        }

        if !self.repos.sessions().update_in_progress(session.clone()).await? {
            debug!(session_id = session.id, "Session finished during tick, progress dropped");
            return Ok(Step::AlreadyFinished);
        }
        if session.end_soc_percent != previous_soc {
            self.repos
                .vehicles()
                .update_soc(vehicle.id, session.end_soc_percent)
                .await?;
        }
        Ok(Step::Charging)
    }

    /// Tick every `tick` of real time until shutdown.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal, tick: Duration) {
        tokio::spawn(async move {
            info!(
                tick_ms = tick.as_millis() as u64,
                simulated_seconds = self.simulated_seconds,
                "🔋 Session simulator started"
            );

            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.tick().await {
                            metrics::counter!("simulator_tick_errors_total").increment(1);
                            warn!(error = %e, "Simulator tick error");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("🔋 Session simulator shutting down");
                        break;
                    }
                }
            }

            info!("🔋 Session simulator stopped");
        });
    }
}
