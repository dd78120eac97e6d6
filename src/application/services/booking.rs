//! Reservation lifecycle
//!
//! Create, cancel and check in bookings, plus the two expiry sweeps that
//! take bookings out of the active set when the driver never shows up.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::availability::AvailabilityService;
use super::status_projector::StatusProjector;
use crate::application::events::{BookingExpiredEvent, Event, ExpiryReason, SharedEventBus};
use crate::config::BookingPolicy;
use crate::domain::{
    Booking, BookingStatus, DomainError, DomainResult, LedgerEntry, RepositoryProvider,
    WalletTransactionKind,
};
use crate::shared::clock::SharedClock;

/// Booking request
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub point_id: i32,
    pub vehicle_id: i32,
    pub booking_time: DateTime<Utc>,
    /// Target state of charge, defaults to 100
    pub desired_percentage: Option<i32>,
}

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
    availability: Arc<AvailabilityService>,
    projector: Arc<StatusProjector>,
    event_bus: SharedEventBus,
    clock: SharedClock,
}

impl BookingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        availability: Arc<AvailabilityService>,
        projector: Arc<StatusProjector>,
        event_bus: SharedEventBus,
        clock: SharedClock,
    ) -> Self {
        Self {
            repos,
            availability,
            projector,
            event_bus,
            clock,
        }
    }

    fn policy(&self) -> &BookingPolicy {
        self.availability.policy()
    }

    /// Book a slot and hold the deposit.
    ///
    /// The deposit is debited before the booking row is written; if the
    /// write fails the deposit is credited back.
    pub async fn create_booking(&self, user_id: i32, req: NewBooking) -> DomainResult<Booking> {
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(req.vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", req.vehicle_id))?;
        if vehicle.owner_id != user_id {
            return Err(DomainError::Forbidden(format!(
                "Vehicle {} does not belong to user {}",
                vehicle.id, user_id
            )));
        }

        let desired = req.desired_percentage.unwrap_or(100);
        let check = self
            .availability
            .check_availability(req.point_id, req.booking_time, req.vehicle_id, Some(desired))
            .await?;
        if !check.available {
            return Err(DomainError::Conflict(
                check
                    .reason
                    .unwrap_or_else(|| "Charging point is not available".into()),
            ));
        }
        if desired > check.max_charge_percent {
            return Err(DomainError::Conflict(format!(
                "Only {}% is reachable before the next booking",
                check.max_charge_percent
            )));
        }
        let Some(estimated_end) = check.estimated_end_time else {
            return Err(DomainError::Conflict("Charging point is not available".into()));
        };

        if !self
            .repos
            .bookings()
            .find_active_for_user(user_id)
            .await?
            .is_empty()
        {
            return Err(DomainError::Conflict(
                "User already holds an active booking".into(),
            ));
        }

        let deposit = self.policy().deposit_amount;
        let wallet = self
            .repos
            .wallets()
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Wallet", "user_id", user_id))?;
        if wallet.balance < deposit {
            return Err(DomainError::InsufficientFunds {
                wallet_id: wallet.id,
                required: deposit,
                available: wallet.balance,
            });
        }

        let now = self.clock.now();
        let id = self.repos.bookings().next_id().await?;

        if deposit > 0 {
            let entry = LedgerEntry::debit(deposit, WalletTransactionKind::BookingDeposit, now)
                .for_booking(id)
                .describe(format!("Deposit for booking {id}"));
            self.repos.wallets().apply(wallet.id, entry).await?;
        }

        let booking = Booking::new(
            id,
            user_id,
            req.vehicle_id,
            req.point_id,
            req.booking_time,
            estimated_end,
            desired,
            deposit,
            now,
        );

        if let Err(e) = self.repos.bookings().save(booking.clone()).await {
            warn!(booking_id = id, error = %e, "Booking not saved, returning deposit");
            if deposit > 0 {
                let refund = LedgerEntry::credit(deposit, WalletTransactionKind::DepositRefund, now)
                    .for_booking(id)
                    .describe(format!("Deposit returned, booking {id} not saved"));
                if let Err(refund_err) = self.repos.wallets().apply(wallet.id, refund).await {
                    warn!(
                        booking_id = id,
                        user_id,
                        error = %refund_err,
                        "Deposit compensation failed"
                    );
                }
            }
            return Err(e);
        }

        metrics::counter!("bookings_created_total").increment(1);
        info!(
            booking_id = id,
            user_id,
            point_id = req.point_id,
            booking_time = %req.booking_time,
            deposit,
            "Booking confirmed"
        );
        Ok(booking)
    }

    /// Cancel a confirmed booking before it starts. The deposit is kept.
    pub async fn cancel_booking(&self, user_id: i32, booking_id: i32) -> DomainResult<Booking> {
        let mut booking = self.get_booking(user_id, booking_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(DomainError::Conflict(format!(
                "Booking {} cannot be cancelled in status {}",
                booking_id, booking.status
            )));
        }
        if self.clock.now() >= booking.booking_time {
            return Err(DomainError::Conflict(format!(
                "Booking {booking_id} has already started"
            )));
        }

        booking.cancel_by_user();
        self.repos.bookings().update(booking.clone()).await?;
        info!(booking_id, user_id, "Booking cancelled by user, deposit forfeited");

        if let Err(e) = self.projector.reconcile_point(booking.point_id).await {
            warn!(booking_id, point_id = booking.point_id, error = %e, "Point reconcile failed");
        }
        Ok(booking)
    }

    /// Check in at the point within the window around `booking_time`.
    pub async fn check_in_booking(&self, user_id: i32, booking_id: i32) -> DomainResult<Booking> {
        let mut booking = self.get_booking(user_id, booking_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(DomainError::Conflict(format!(
                "Booking {} cannot be checked in from status {}",
                booking_id, booking.status
            )));
        }

        let now = self.clock.now();
        let window = self.policy().check_in_window();
        if now < booking.booking_time - window || now > booking.booking_time + window {
            return Err(DomainError::Validation(format!(
                "Check-in is only possible within {} minutes of the booking time",
                self.policy().check_in_window_minutes
            )));
        }

        booking.check_in(now);
        self.repos.bookings().update(booking.clone()).await?;
        info!(booking_id, user_id, point_id = booking.point_id, "Checked in");
        Ok(booking)
    }

    /// A booking owned by `user_id`
    pub async fn get_booking(&self, user_id: i32, booking_id: i32) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))?;
        if booking.user_id != user_id {
            return Err(DomainError::Forbidden(format!(
                "Booking {booking_id} belongs to another user"
            )));
        }
        Ok(booking)
    }

    /// Expire confirmed bookings whose check-in window closed. No refund.
    pub async fn expire_missed_bookings(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let cutoff = now - self.policy().check_in_window();
        let missed = self.repos.bookings().find_confirmed_before(cutoff).await?;

        let mut expired = 0;
        for booking in missed {
            let booking_id = booking.id;
            match self.expire(booking, ExpiryReason::MissedCheckIn, 0, now).await {
                Ok(()) => expired += 1,
                Err(e) => warn!(booking_id, error = %e, "Failed to expire missed booking"),
            }
        }

        if expired > 0 {
            info!(count = expired, "Expired bookings without check-in");
        }
        Ok(expired)
    }

    /// Expire checked-in bookings that never started a session, returning
    /// part of the deposit.
    pub async fn expire_stale_check_ins(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let cutoff = now - self.policy().check_in_timeout();
        let stale = self.repos.bookings().find_checked_in_before(cutoff).await?;

        let mut expired = 0;
        for booking in stale {
            let booking_id = booking.id;
            match self.expire_stale(booking, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => warn!(booking_id, error = %e, "Failed to expire stale check-in"),
            }
        }

        if expired > 0 {
            info!(count = expired, "Expired check-ins without a session");
        }
        Ok(expired)
    }

    async fn expire_stale(&self, booking: Booking, now: DateTime<Utc>) -> DomainResult<bool> {
        if self.repos.sessions().find_by_booking(booking.id).await?.is_some() {
            return Ok(false);
        }
        if self
            .repos
            .sessions()
            .find_active_for_point(booking.point_id)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let refund = self.policy().timeout_refund(booking.deposit_amount);
        if refund > 0 {
            self.refund_once(&booking, refund, now).await?;
        }
        self.expire(booking, ExpiryReason::CheckInTimeout, refund, now)
            .await?;
        Ok(true)
    }

    /// Credit the timeout refund unless a previous run already did.
    async fn refund_once(&self, booking: &Booking, amount: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let wallets = self.repos.wallets();
        if wallets
            .find_booking_transaction(booking.id, WalletTransactionKind::DepositRefund)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let wallet = wallets
            .find_by_user(booking.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Wallet", "user_id", booking.user_id))?;
        let entry = LedgerEntry::credit(amount, WalletTransactionKind::DepositRefund, now)
            .for_booking(booking.id)
            .describe(format!("Partial deposit refund, booking {}", booking.id));
        match wallets.apply(wallet.id, entry).await {
            // another sweep got there first
            Ok(_) | Err(DomainError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn expire(
        &self,
        mut booking: Booking,
        reason: ExpiryReason,
        refunded: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        booking.expire();
        self.repos.bookings().update(booking.clone()).await?;

        if let Err(e) = self.projector.reconcile_point(booking.point_id).await {
            warn!(
                booking_id = booking.id,
                point_id = booking.point_id,
                error = %e,
                "Point reconcile failed"
            );
        }

        metrics::counter!("bookings_expired_total", "reason" => reason.as_str()).increment(1);
        info!(
            booking_id = booking.id,
            user_id = booking.user_id,
            reason = reason.as_str(),
            refunded,
            "Booking expired"
        );
        self.event_bus.publish(Event::BookingExpired(BookingExpiredEvent {
            booking_id: booking.id,
            user_id: booking.user_id,
            point_id: booking.point_id,
            reason,
            refunded,
            timestamp: now,
        }));
        Ok(())
    }
}
