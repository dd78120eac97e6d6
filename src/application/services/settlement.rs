//! Settlement service
//!
//! Turns a completed session's cost into wallet movements against the
//! booking deposit. The store records at most one movement of each kind per
//! session, so settling the same session again, even concurrently, never
//! moves money twice.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::application::events::{Event, PaymentSettledEvent, SharedEventBus};
use crate::domain::{
    Booking, BookingStatus, ChargingSession, DomainError, DomainResult, LedgerEntry, Payment,
    PaymentMethod, RepositoryProvider, SessionStatus, WalletTransactionKind,
};
use crate::shared::clock::SharedClock;
use crate::shared::retry::{retry_with_backoff, RetryConfig, Sleeper};
use crate::shared::shutdown::ShutdownSignal;

pub struct SettlementService {
    repos: Arc<dyn RepositoryProvider>,
    event_bus: SharedEventBus,
    clock: SharedClock,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl SettlementService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        event_bus: SharedEventBus,
        clock: SharedClock,
        retry: RetryConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            repos,
            event_bus,
            clock,
            retry,
            sleeper,
        }
    }

    /// Settle one completed session.
    ///
    /// A payment that is already completed is returned unchanged. When the
    /// wallet cannot cover the part of the cost above the deposit, the
    /// payment stays `Unpaid` and the booking is completed anyway.
    pub async fn settle(&self, session_id: i32) -> DomainResult<Payment> {
        let session = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", "id", session_id))?;
        if session.status != SessionStatus::Completed {
            return Err(DomainError::Validation(format!(
                "Session {session_id} is not completed"
            )));
        }

        let mut payment = self.open_payment(&session).await?;
        if payment.is_completed() {
            return Ok(payment);
        }

        let booking = self.related_booking(&session, &payment).await?;
        let deposit = booking
            .as_ref()
            .filter(|b| matches!(b.status, BookingStatus::InProgress | BookingStatus::Completed))
            .map(|b| b.deposit_amount)
            .unwrap_or(0);
        let cost = session.cost_total;
        let now = self.clock.now();

        if booking.is_some() && cost <= deposit {
            let refund = deposit - cost;
            if refund > 0 {
                self.apply_once(
                    &session,
                    LedgerEntry::credit(refund, WalletTransactionKind::SettlementRefund, now)
                        .describe(format!("Unused deposit, session {}", session.id)),
                )
                .await?;
            }
            payment.deposit_applied = cost;
            payment.mark_completed(PaymentMethod::Deposit, now);
        } else {
            let due = cost - deposit;
            payment.deposit_applied = deposit;
            let charged = if due > 0 {
                let entry = LedgerEntry::debit(due, WalletTransactionKind::SessionCharge, now)
                    .describe(format!("Charging session {}", session.id));
                match self.apply_once(&session, entry).await {
                    Ok(()) => true,
                    Err(DomainError::InsufficientFunds { required, available, .. }) => {
                        warn!(
                            session_id,
                            payer_id = session.driver_id,
                            required,
                            available,
                            "Wallet cannot cover session, payment left unpaid"
                        );
                        false
                    }
                    Err(e) => return Err(e),
                }
            } else {
                true
            };
            if charged {
                payment.mark_completed(PaymentMethod::Wallet, now);
            } else {
                payment.mark_unpaid(now);
            }
        }

        payment.booking_id = booking.as_ref().map(|b| b.id);
        self.repos.payments().update(payment.clone()).await?;

        if let Some(mut booking) = booking.filter(|b| b.is_active()) {
            booking.complete();
            self.repos.bookings().update(booking).await?;
        }

        let outcome = if payment.is_completed() { "paid" } else { "debt" };
        metrics::counter!("settlements_total", "outcome" => outcome).increment(1);
        info!(
            session_id,
            payment_id = payment.id,
            cost,
            deposit,
            status = %payment.status,
            "Session settled"
        );
        self.event_bus.publish(Event::PaymentSettled(PaymentSettledEvent {
            payment_id: payment.id,
            session_id,
            payer_id: payment.payer_id,
            status: payment.status.to_string(),
            amount: payment.amount,
            timestamp: now,
        }));
        Ok(payment)
    }

    /// [`settle`](Self::settle) with bounded retry on store contention.
    pub async fn settle_with_retry(&self, session_id: i32) -> DomainResult<Payment> {
        retry_with_backoff(
            &self.retry,
            self.sleeper.as_ref(),
            || self.settle(session_id),
            |e: &DomainError| e.is_transient(),
            "settle_session",
        )
        .await
    }

    /// Payment of one of the caller's sessions.
    pub async fn payment_for_session(&self, user_id: i32, session_id: i32) -> DomainResult<Payment> {
        let payment = self
            .repos
            .payments()
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", "session_id", session_id))?;
        if payment.payer_id != user_id {
            return Err(DomainError::Forbidden(format!(
                "Payment for session {session_id} belongs to another user"
            )));
        }
        Ok(payment)
    }

    /// Re-run settlement for one of the caller's sessions, e.g. after
    /// topping up to clear a debt.
    pub async fn settle_for_driver(&self, user_id: i32, session_id: i32) -> DomainResult<Payment> {
        let session = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", "id", session_id))?;
        if session.driver_id != user_id {
            return Err(DomainError::Forbidden(format!(
                "Session {session_id} belongs to another user"
            )));
        }
        self.settle_with_retry(session_id).await
    }

    /// Settle payments that settlement never ran for.
    ///
    /// Catches completions the worker missed: events dropped by a lagging
    /// subscriber or published while the worker was down. Debts already
    /// attempted are left for the driver to settle.
    pub async fn settle_pending(&self) -> DomainResult<usize> {
        let pending = self.repos.payments().find_unattempted().await?;

        let mut settled = 0;
        for payment in pending {
            match self.settle_with_retry(payment.session_id).await {
                Ok(_) => settled += 1,
                Err(e) => warn!(
                    session_id = payment.session_id,
                    error = %e,
                    "Pending settlement failed"
                ),
            }
        }

        if settled > 0 {
            info!(count = settled, "Settled sessions the worker had not seen");
        }
        Ok(settled)
    }

    /// Settle every completed session announced on the bus, plus a sweep of
    /// pending payments at startup and every `sweep`.
    pub fn start_worker(self: Arc<Self>, shutdown: ShutdownSignal, sweep: Duration) {
        let mut events = self.event_bus.subscribe();
        tokio::spawn(async move {
            info!(sweep_secs = sweep.as_secs(), "💳 Settlement worker started");

            let mut interval = tokio::time::interval(sweep);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    msg = events.recv() => {
                        let Some(msg) = msg else { break };
                        if let Event::SessionCompleted(e) = msg.event {
                            if let Err(err) = self.settle_with_retry(e.session_id).await {
                                error!(session_id = e.session_id, error = %err, "Settlement failed");
                            }
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = self.settle_pending().await {
                            warn!(error = %e, "Settlement sweep error");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("💳 Settlement worker shutting down");
                        break;
                    }
                }
            }

            info!("💳 Settlement worker stopped");
        });
    }

    async fn open_payment(&self, session: &ChargingSession) -> DomainResult<Payment> {
        let payments = self.repos.payments();
        if let Some(existing) = payments.find_by_session(session.id).await? {
            return Ok(existing);
        }
        let fresh = Payment::unpaid(
            session.driver_id,
            session.id,
            session.cost_total,
            self.clock.now(),
        );
        match payments.create(fresh).await {
            Ok(p) => Ok(p),
            Err(DomainError::Conflict(_)) => payments
                .find_by_session(session.id)
                .await?
                .ok_or_else(|| DomainError::not_found("Payment", "session_id", session.id)),
            Err(e) => Err(e),
        }
    }

    async fn related_booking(
        &self,
        session: &ChargingSession,
        payment: &Payment,
    ) -> DomainResult<Option<Booking>> {
        let bookings = self.repos.bookings();
        if let Some(id) = payment.booking_id.or(session.booking_id) {
            return bookings.find_by_id(id).await;
        }
        bookings
            .find_in_progress_for_user_and_point(session.driver_id, session.point_id)
            .await
    }

    /// Apply a session-linked entry unless one of the same kind exists.
    ///
    /// The lookup skips the common case; a concurrent settlement that gets
    /// past it is stopped by the store's conflict and counts as applied.
    async fn apply_once(&self, session: &ChargingSession, entry: LedgerEntry) -> DomainResult<()> {
        let wallets = self.repos.wallets();
        if wallets
            .find_session_transaction(session.id, entry.kind)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let wallet = match wallets.find_by_user(session.driver_id).await? {
            Some(w) => w,
            None if entry.is_debit() => {
                return Err(DomainError::InsufficientFunds {
                    wallet_id: 0,
                    required: -entry.amount,
                    available: 0,
                });
            }
            None => wallets.create(session.driver_id).await?,
        };
        let kind = entry.kind;
        match wallets.apply(wallet.id, entry.for_session(session.id)).await {
            Ok(_) => Ok(()),
            Err(DomainError::Conflict(_)) => {
                debug!(session_id = session.id, kind = kind.as_str(), "Entry already applied");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::booking::NewBooking;
    use crate::application::services::test_support::Fixture;
    use crate::domain::billing_plan::BillingPlanRepository;
    use crate::domain::booking::BookingRepository;
    use crate::domain::charging_point::ChargingPointRepository;
    use crate::domain::payment::PaymentRepository;
    use crate::domain::session::SessionRepository;
    use crate::domain::vehicle::VehicleRepository;
    use crate::domain::wallet::WalletRepository;
    use crate::domain::PaymentStatus;
    use crate::infrastructure::InMemoryRepositoryProvider;
    use crate::shared::clock::Clock;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// User 7 funded with `funds`, booked and checked in on point 1.
    async fn checked_in(fx: &Fixture, funds: i64) -> Booking {
        fx.point(1, 50.0).await;
        fx.vehicle(10, 7, 60.0, 50.0, 40).await;
        fx.fund(7, funds).await;
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
        fx.clock.set(at);
        fx.bookings.check_in_booking(7, booking.id).await.unwrap()
    }

    async fn completed_session(fx: &Fixture, booking_id: Option<i32>, cost: i64) -> ChargingSession {
        let now = fx.clock.now();
        let mut session = fx
            .repos
            .sessions()
            .create(ChargingSession::new(7, 10, 1, booking_id, 40, 80, now))
            .await
            .unwrap();
        session.complete(now, cost);
        fx.repos.sessions().update(session.clone()).await.unwrap();
        session
    }

    #[tokio::test]
    async fn deposit_covers_cost_and_difference_is_refunded() {
        let fx = Fixture::new();
        let booking = checked_in(&fx, 60_000).await;
        assert_eq!(fx.balance(7).await, 10_000);
        let session = completed_session(&fx, Some(booking.id), 30_000).await;

        let payment = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.method, PaymentMethod::Deposit);
        assert_eq!(payment.deposit_applied, 30_000);
        assert_eq!(payment.booking_id, Some(booking.id));
        assert_eq!(fx.balance(7).await, 30_000);

        let stored = fx.repos.bookings().find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn shortfall_leaves_payment_unpaid_without_rollback() {
        let fx = Fixture::new();
        let booking = checked_in(&fx, 60_000).await;
        let session = completed_session(&fx, Some(booking.id), 80_000).await;

        let payment = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Unpaid);
        assert_eq!(payment.deposit_applied, 50_000);
        assert_eq!(fx.balance(7).await, 10_000);

        let stored = fx.repos.bookings().find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
        let stored = fx.repos.sessions().find_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);

        // debt can be settled after a top-up
        fx.fund(7, 20_000).await;
        let payment = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.method, PaymentMethod::Wallet);
        assert_eq!(fx.balance(7).await, 0);
    }

    #[tokio::test]
    async fn settlement_on_sqlite_store() {
        use crate::infrastructure::{
            init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider,
        };

        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&db).await.unwrap();
        let fx = Fixture::with_repos(Arc::new(SeaOrmRepositoryProvider::new(db)));

        let booking = checked_in(&fx, 60_000).await;
        let session = completed_session(&fx, Some(booking.id), 30_000).await;

        let first = fx.settlement.settle(session.id).await.unwrap();
        let again = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.status, PaymentStatus::Completed);
        assert_eq!(fx.balance(7).await, 30_000);

        let txs = fx.wallets.transactions(7).await.unwrap();
        let kinds: Vec<_> = txs.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                WalletTransactionKind::TopUp,
                WalletTransactionKind::BookingDeposit,
                WalletTransactionKind::SettlementRefund,
            ]
        );
        assert_eq!(txs.iter().map(|t| t.amount).sum::<i64>(), 30_000);
    }

    #[tokio::test]
    async fn concurrent_settlements_charge_once_on_sqlite() {
        use crate::infrastructure::{
            init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider,
        };

        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&db).await.unwrap();
        let fx = Fixture::with_repos(Arc::new(SeaOrmRepositoryProvider::new(db)));
        fx.point(1, 50.0).await;
        fx.fund(7, 10_000).await;
        let session = completed_session(&fx, None, 4_000).await;
        fx.repos
            .payments()
            .create(Payment::unpaid(7, session.id, 4_000, fx.clock.now()))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            fx.settlement.settle(session.id),
            fx.settlement.settle(session.id)
        );
        assert!(a.unwrap().is_completed());
        assert!(b.unwrap().is_completed());

        assert_eq!(fx.balance(7).await, 6_000);
        let charges = fx
            .wallets
            .transactions(7)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == WalletTransactionKind::SessionCharge)
            .count();
        assert_eq!(charges, 1);
    }

    #[tokio::test]
    async fn charge_recorded_by_a_concurrent_run_is_not_repeated() {
        let repos = Arc::new(BlindLedgerRepos {
            inner: Arc::new(InMemoryRepositoryProvider::new()),
        });
        let fx = Fixture::with_repos(repos.clone());
        let wallet = fx.fund(7, 10_000).await;
        let session = completed_session(&fx, None, 4_000).await;

        // the other run got its debit in first
        repos
            .inner
            .wallets()
            .apply(
                wallet.id,
                LedgerEntry::debit(4_000, WalletTransactionKind::SessionCharge, fx.clock.now())
                    .for_session(session.id),
            )
            .await
            .unwrap();

        let payment = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(fx.balance(7).await, 6_000);
    }

    #[tokio::test]
    async fn payments_are_visible_to_the_payer_only() {
        let fx = Fixture::new();
        let booking = checked_in(&fx, 60_000).await;
        let session = completed_session(&fx, Some(booking.id), 30_000).await;

        assert!(matches!(
            fx.settlement.payment_for_session(7, session.id).await,
            Err(DomainError::NotFound { .. })
        ));
        let paid = fx.settlement.settle_for_driver(7, session.id).await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Completed);

        let seen = fx.settlement.payment_for_session(7, session.id).await.unwrap();
        assert_eq!(seen.id, paid.id);
        assert!(matches!(
            fx.settlement.payment_for_session(8, session.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            fx.settlement.settle_for_driver(8, session.id).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn settling_twice_moves_money_once() {
        let fx = Fixture::new();
        let booking = checked_in(&fx, 70_000).await;
        let session = completed_session(&fx, Some(booking.id), 70_000).await;

        let first = fx.settlement.settle(session.id).await.unwrap();
        let second = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, PaymentStatus::Completed);
        assert_eq!(fx.balance(7).await, 0);

        let charges = fx
            .wallets
            .transactions(7)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == WalletTransactionKind::SessionCharge)
            .count();
        assert_eq!(charges, 1);
    }

    #[tokio::test]
    async fn in_progress_booking_is_found_without_explicit_link() {
        let fx = Fixture::new();
        let booking = checked_in(&fx, 60_000).await;
        let session = completed_session(&fx, None, 10_000).await;

        let payment = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(payment.booking_id, Some(booking.id));
        assert_eq!(fx.balance(7).await, 50_000);
    }

    #[tokio::test]
    async fn walk_in_session_is_charged_in_full() {
        let fx = Fixture::new();
        fx.fund(7, 5_000).await;
        let session = completed_session(&fx, None, 4_000).await;

        let payment = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.deposit_applied, 0);
        assert!(payment.booking_id.is_none());
        assert_eq!(fx.balance(7).await, 1_000);
    }

    #[tokio::test]
    async fn running_session_cannot_be_settled() {
        let fx = Fixture::new();
        let session = fx
            .repos
            .sessions()
            .create(ChargingSession::new(7, 10, 1, None, 40, 80, fx.clock.now()))
            .await
            .unwrap();

        assert!(matches!(
            fx.settlement.settle(session.id).await,
            Err(DomainError::Validation(_))
        ));
    }

    /// Payments store that reports contention for its first `failures` lookups.
    struct FlakyPayments {
        inner: Arc<InMemoryRepositoryProvider>,
        failures: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl PaymentRepository for FlakyPayments {
        async fn create(&self, payment: Payment) -> DomainResult<Payment> {
            self.inner.payments().create(payment).await
        }
        async fn update(&self, payment: Payment) -> DomainResult<()> {
            self.inner.payments().update(payment).await
        }
        async fn find_by_id(&self, id: i32) -> DomainResult<Option<Payment>> {
            self.inner.payments().find_by_id(id).await
        }
        async fn find_by_session(&self, session_id: i32) -> DomainResult<Option<Payment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(DomainError::Contention("database is locked".into()));
            }
            self.inner.payments().find_by_session(session_id).await
        }
        async fn find_unattempted(&self) -> DomainResult<Vec<Payment>> {
            self.inner.payments().find_unattempted().await
        }
    }

    struct FlakyRepos {
        inner: Arc<InMemoryRepositoryProvider>,
        payments: FlakyPayments,
    }

    impl FlakyRepos {
        fn new(failures: u32) -> Self {
            let inner = Arc::new(InMemoryRepositoryProvider::new());
            Self {
                payments: FlakyPayments {
                    inner: inner.clone(),
                    failures: AtomicU32::new(failures),
                    calls: AtomicU32::new(0),
                },
                inner,
            }
        }
    }

    impl RepositoryProvider for FlakyRepos {
        fn charging_points(&self) -> &dyn ChargingPointRepository {
            self.inner.charging_points()
        }
        fn vehicles(&self) -> &dyn VehicleRepository {
            self.inner.vehicles()
        }
        fn billing_plans(&self) -> &dyn BillingPlanRepository {
            self.inner.billing_plans()
        }
        fn bookings(&self) -> &dyn BookingRepository {
            self.inner.bookings()
        }
        fn sessions(&self) -> &dyn SessionRepository {
            self.inner.sessions()
        }
        fn payments(&self) -> &dyn PaymentRepository {
            &self.payments
        }
        fn wallets(&self) -> &dyn WalletRepository {
            self.inner.wallets()
        }
    }

    /// Wallet store whose by-session lookup never finds anything, as if a
    /// concurrent settlement wrote between the lookup and the apply.
    struct BlindLedgerRepos {
        inner: Arc<InMemoryRepositoryProvider>,
    }

    #[async_trait]
    impl WalletRepository for BlindLedgerRepos {
        async fn create(&self, user_id: i32) -> DomainResult<crate::domain::Wallet> {
            self.inner.wallets().create(user_id).await
        }
        async fn find_by_user(&self, user_id: i32) -> DomainResult<Option<crate::domain::Wallet>> {
            self.inner.wallets().find_by_user(user_id).await
        }
        async fn apply(
            &self,
            wallet_id: i32,
            entry: LedgerEntry,
        ) -> DomainResult<(crate::domain::Wallet, crate::domain::WalletTransaction)> {
            self.inner.wallets().apply(wallet_id, entry).await
        }
        async fn list_transactions(
            &self,
            wallet_id: i32,
        ) -> DomainResult<Vec<crate::domain::WalletTransaction>> {
            self.inner.wallets().list_transactions(wallet_id).await
        }
        async fn find_session_transaction(
            &self,
            _session_id: i32,
            _kind: WalletTransactionKind,
        ) -> DomainResult<Option<crate::domain::WalletTransaction>> {
            Ok(None)
        }
        async fn find_booking_transaction(
            &self,
            booking_id: i32,
            kind: WalletTransactionKind,
        ) -> DomainResult<Option<crate::domain::WalletTransaction>> {
            self.inner.wallets().find_booking_transaction(booking_id, kind).await
        }
    }

    impl RepositoryProvider for BlindLedgerRepos {
        fn charging_points(&self) -> &dyn ChargingPointRepository {
            self.inner.charging_points()
        }
        fn vehicles(&self) -> &dyn VehicleRepository {
            self.inner.vehicles()
        }
        fn billing_plans(&self) -> &dyn BillingPlanRepository {
            self.inner.billing_plans()
        }
        fn bookings(&self) -> &dyn BookingRepository {
            self.inner.bookings()
        }
        fn sessions(&self) -> &dyn SessionRepository {
            self.inner.sessions()
        }
        fn payments(&self) -> &dyn PaymentRepository {
            self.inner.payments()
        }
        fn wallets(&self) -> &dyn WalletRepository {
            self
        }
    }

    #[tokio::test]
    async fn contention_is_retried_with_backoff() {
        let repos = Arc::new(FlakyRepos::new(2));
        let fx = Fixture::with_repos(repos.clone());
        fx.fund(7, 5_000).await;
        let session = completed_session(&fx, None, 4_000).await;

        let payment = fx.settlement.settle_with_retry(session.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(repos.payments.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *fx.sleeper.delays.lock().unwrap(),
            vec![
                std::time::Duration::from_millis(200),
                std::time::Duration::from_millis(400)
            ]
        );
        assert_eq!(fx.balance(7).await, 1_000);
    }

    #[tokio::test]
    async fn persistent_contention_gives_up_after_three_attempts() {
        let repos = Arc::new(FlakyRepos::new(10));
        let fx = Fixture::with_repos(repos.clone());
        fx.fund(7, 5_000).await;
        let session = completed_session(&fx, None, 4_000).await;

        let err = fx.settlement.settle_with_retry(session.id).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(repos.payments.calls.load(Ordering::SeqCst), 3);
        assert_eq!(fx.balance(7).await, 5_000);
    }

    #[tokio::test]
    async fn worker_settles_completed_sessions() {
        let fx = Fixture::new();
        fx.fund(7, 5_000).await;
        let session = completed_session(&fx, None, 4_000).await;
        let shutdown = ShutdownSignal::new();
        fx.settlement
            .clone()
            .start_worker(shutdown.clone(), std::time::Duration::from_secs(3600));

        fx.bus.publish(Event::SessionCompleted(
            crate::application::events::SessionCompletedEvent {
                session_id: session.id,
                driver_id: 7,
                point_id: 1,
                booking_id: None,
                cost_total: 4_000,
                timestamp: fx.clock.now(),
            },
        ));

        let mut settled = false;
        for _ in 0..50 {
            if let Some(p) = fx.repos.payments().find_by_session(session.id).await.unwrap() {
                if p.is_completed() {
                    settled = true;
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        shutdown.trigger();
        assert!(settled);
    }

    #[tokio::test]
    async fn sweep_settles_completions_nobody_announced() {
        let fx = Fixture::new();
        fx.fund(7, 5_000).await;
        let session = completed_session(&fx, None, 4_000).await;
        fx.repos
            .payments()
            .create(Payment::unpaid(7, session.id, 4_000, fx.clock.now()))
            .await
            .unwrap();

        assert_eq!(fx.settlement.settle_pending().await.unwrap(), 1);
        let payment = fx.repos.payments().find_by_session(session.id).await.unwrap().unwrap();
        assert!(payment.is_completed());
        assert_eq!(fx.balance(7).await, 1_000);

        assert_eq!(fx.settlement.settle_pending().await.unwrap(), 0);
        assert_eq!(fx.balance(7).await, 1_000);
    }

    #[tokio::test]
    async fn sweep_leaves_attempted_debts_alone() {
        let fx = Fixture::new();
        fx.fund(7, 1_000).await;
        let session = completed_session(&fx, None, 4_000).await;

        let debt = fx.settlement.settle(session.id).await.unwrap();
        assert_eq!(debt.status, PaymentStatus::Unpaid);
        assert!(debt.attempted_at.is_some());

        fx.fund(7, 10_000).await;
        assert_eq!(fx.settlement.settle_pending().await.unwrap(), 0);
        assert_eq!(fx.balance(7).await, 11_000);
    }

    #[tokio::test]
    async fn worker_catches_up_on_start() {
        let fx = Fixture::new();
        fx.fund(7, 5_000).await;
        let session = completed_session(&fx, None, 4_000).await;
        fx.repos
            .payments()
            .create(Payment::unpaid(7, session.id, 4_000, fx.clock.now()))
            .await
            .unwrap();

        let shutdown = ShutdownSignal::new();
        fx.settlement
            .clone()
            .start_worker(shutdown.clone(), std::time::Duration::from_secs(3600));

        let mut settled = false;
        for _ in 0..50 {
            let payment = fx.repos.payments().find_by_session(session.id).await.unwrap().unwrap();
            if payment.is_completed() {
                settled = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        shutdown.trigger();
        assert!(settled);
        assert_eq!(fx.balance(7).await, 1_000);
    }
}
