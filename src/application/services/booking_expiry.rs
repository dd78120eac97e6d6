//! Background tasks that take abandoned bookings out of the active set.
//!
//! Two loops share the [`BookingService`]: one expires confirmed bookings
//! whose check-in window closed, the other expires check-ins that never
//! started a session.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{info, warn};

use super::booking::BookingService;
use crate::shared::clock::SharedClock;
use crate::shared::shutdown::ShutdownSignal;

/// Start the missed-booking sweep.
pub fn start_booking_expiry_task(
    bookings: Arc<BookingService>,
    clock: SharedClock,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "📅 Booking expiry task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = bookings.expire_missed_bookings(clock.now()).await {
                        warn!(error = %e, "Booking expiry check error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("📅 Booking expiry task shutting down");
                    break;
                }
            }
        }

        info!("📅 Booking expiry task stopped");
    });
}

/// Start the check-in timeout sweep.
pub fn start_check_in_timeout_task(
    bookings: Arc<BookingService>,
    clock: SharedClock,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "⏱️ Check-in timeout task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = bookings.expire_stale_check_ins(clock.now()).await {
                        warn!(error = %e, "Check-in timeout check error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("⏱️ Check-in timeout task shutting down");
                    break;
                }
            }
        }

        info!("⏱️ Check-in timeout task stopped");
    });
}
