//! In-memory repository implementations
//!
//! DashMap-backed stores for development and testing. Each repository keeps
//! its own maps; the wallet store applies entries under the wallet's map
//! entry lock, which makes check-and-update atomic per wallet.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::billing_plan::BillingPlanRepository;
use crate::domain::booking::BookingRepository;
use crate::domain::charging_point::ChargingPointRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::session::SessionRepository;
use crate::domain::vehicle::VehicleRepository;
use crate::domain::wallet::WalletRepository;
use crate::domain::{
    BillingPlan, Booking, BookingStatus, ChargingPoint, ChargingSession, DomainError,
    DomainResult, LedgerEntry, Payment, PaymentStatus, PointStatus, RepositoryProvider,
    SessionStatus, Vehicle, Wallet, WalletTransaction, WalletTransactionKind,
};

// ── Charging points ─────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryChargingPointRepository {
    points: DashMap<i32, ChargingPoint>,
}

#[async_trait]
impl ChargingPointRepository for InMemoryChargingPointRepository {
    async fn save(&self, point: ChargingPoint) -> DomainResult<()> {
        if self.points.contains_key(&point.id) {
            return Err(DomainError::Conflict(format!(
                "Charging point {} already exists",
                point.id
            )));
        }
        self.points.insert(point.id, point);
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingPoint>> {
        Ok(self.points.get(&id).map(|p| p.clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargingPoint>> {
        let mut points: Vec<ChargingPoint> = self.points.iter().map(|p| p.clone()).collect();
        points.sort_by_key(|p| p.id);
        Ok(points)
    }

    async fn find_by_status(&self, status: PointStatus) -> DomainResult<Vec<ChargingPoint>> {
        let mut points: Vec<ChargingPoint> = self
            .points
            .iter()
            .filter(|p| p.status == status)
            .map(|p| p.clone())
            .collect();
        points.sort_by_key(|p| p.id);
        Ok(points)
    }

    async fn update(&self, point: ChargingPoint) -> DomainResult<()> {
        if !self.points.contains_key(&point.id) {
            return Err(DomainError::not_found("ChargingPoint", "id", point.id));
        }
        self.points.insert(point.id, point);
        Ok(())
    }

    async fn update_status(&self, id: i32, status: PointStatus) -> DomainResult<()> {
        let mut point = self
            .points
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("ChargingPoint", "id", id))?;
        point.status = status;
        point.updated_at = Utc::now();
        Ok(())
    }
}

// ── Vehicles ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    vehicles: DashMap<i32, Vehicle>,
}

#[async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn save(&self, vehicle: Vehicle) -> DomainResult<()> {
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Vehicle>> {
        Ok(self.vehicles.get(&id).map(|v| v.clone()))
    }

    async fn update_soc(&self, id: i32, soc_percent: i32) -> DomainResult<()> {
        let mut vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", id))?;
        vehicle.current_soc_percent = soc_percent;
        Ok(())
    }
}

// ── Billing plans ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryBillingPlanRepository {
    plans: DashMap<i32, BillingPlan>,
}

#[async_trait]
impl BillingPlanRepository for InMemoryBillingPlanRepository {
    async fn save(&self, plan: BillingPlan) -> DomainResult<()> {
        self.plans.insert(plan.id, plan);
        Ok(())
    }

    async fn find_active(&self) -> DomainResult<Option<BillingPlan>> {
        Ok(self
            .plans
            .iter()
            .filter(|p| p.is_active)
            .min_by_key(|p| p.id)
            .map(|p| p.clone()))
    }
}

// ── Bookings ────────────────────────────────────────────────────

pub struct InMemoryBookingRepository {
    bookings: DashMap<i32, Booking>,
    counter: AtomicI32,
}

impl Default for InMemoryBookingRepository {
    fn default() -> Self {
        Self {
            bookings: DashMap::new(),
            counter: AtomicI32::new(1),
        }
    }
}

impl InMemoryBookingRepository {
    fn collect(&self, pred: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| pred(b.value()))
            .map(|b| b.clone())
            .collect();
        out.sort_by_key(|b| (b.booking_time, b.id));
        out
    }
}

fn in_range(at: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    at >= from && at <= to
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn save(&self, booking: Booking) -> DomainResult<()> {
        match self.bookings.entry(booking.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "Booking {} already exists",
                booking.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                self.counter.fetch_max(booking.id + 1, Ordering::SeqCst);
                slot.insert(booking);
                Ok(())
            }
        }
    }

    async fn update(&self, booking: Booking) -> DomainResult<()> {
        if !self.bookings.contains_key(&booking.id) {
            return Err(DomainError::not_found("Booking", "id", booking.id));
        }
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.clone()))
    }

    async fn find_active_for_user(&self, user_id: i32) -> DomainResult<Vec<Booking>> {
        Ok(self.collect(|b| b.user_id == user_id && b.is_active()))
    }

    async fn find_active_for_point_between(
        &self,
        point_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        Ok(self.collect(|b| {
            b.point_id == point_id && b.is_active() && in_range(b.booking_time, from, to)
        }))
    }

    async fn find_latest_active_at_or_before(
        &self,
        point_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>> {
        Ok(self
            .collect(|b| b.point_id == point_id && b.is_active() && b.booking_time <= at)
            .pop())
    }

    async fn find_next_active_after(
        &self,
        point_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>> {
        Ok(self
            .collect(|b| b.point_id == point_id && b.is_active() && b.booking_time > at)
            .into_iter()
            .next())
    }

    async fn find_active_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        Ok(self.collect(|b| b.is_active() && in_range(b.booking_time, from, to)))
    }

    async fn find_confirmed_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        Ok(self.collect(|b| b.status == BookingStatus::Confirmed && b.booking_time < cutoff))
    }

    async fn find_checked_in_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        Ok(self.collect(|b| {
            b.status == BookingStatus::InProgress
                && b.checked_in_at.map(|at| at < cutoff).unwrap_or(false)
        }))
    }

    async fn find_in_progress_for_user_and_point(
        &self,
        user_id: i32,
        point_id: i32,
    ) -> DomainResult<Option<Booking>> {
        Ok(self
            .collect(|b| {
                b.user_id == user_id
                    && b.point_id == point_id
                    && b.status == BookingStatus::InProgress
            })
            .pop())
    }

    async fn next_id(&self) -> DomainResult<i32> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

// ── Sessions ────────────────────────────────────────────────────

pub struct InMemorySessionRepository {
    sessions: DashMap<i32, ChargingSession>,
    counter: AtomicI32,
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
            counter: AtomicI32::new(1),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, mut session: ChargingSession) -> DomainResult<ChargingSession> {
        session.id = self.counter.fetch_add(1, Ordering::SeqCst);
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn update(&self, session: ChargingSession) -> DomainResult<()> {
        if !self.sessions.contains_key(&session.id) {
            return Err(DomainError::not_found("ChargingSession", "id", session.id));
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn update_in_progress(&self, session: ChargingSession) -> DomainResult<bool> {
        let Some(mut stored) = self.sessions.get_mut(&session.id) else {
            return Ok(false);
        };
        if stored.status != SessionStatus::InProgress {
            return Ok(false);
        }
        *stored = session;
        Ok(true)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingSession>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn find_in_progress(&self) -> DomainResult<Vec<ChargingSession>> {
        let mut sessions: Vec<ChargingSession> = self
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::InProgress)
            .map(|s| s.clone())
            .collect();
        sessions.sort_by_key(|s| s.id);
        Ok(sessions)
    }

    async fn find_active_for_point(&self, point_id: i32) -> DomainResult<Option<ChargingSession>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.point_id == point_id && s.status == SessionStatus::InProgress)
            .map(|s| s.clone()))
    }

    async fn find_by_booking(&self, booking_id: i32) -> DomainResult<Option<ChargingSession>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.booking_id == Some(booking_id))
            .map(|s| s.clone()))
    }
}

// ── Payments ────────────────────────────────────────────────────

pub struct InMemoryPaymentRepository {
    payments: DashMap<i32, Payment>,
    /// session id -> payment id
    by_session: DashMap<i32, i32>,
    counter: AtomicI32,
}

impl Default for InMemoryPaymentRepository {
    fn default() -> Self {
        Self {
            payments: DashMap::new(),
            by_session: DashMap::new(),
            counter: AtomicI32::new(1),
        }
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, mut payment: Payment) -> DomainResult<Payment> {
        // The entry lock on `by_session` enforces one payment per session.
        match self.by_session.entry(payment.session_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "Payment for session {} already exists",
                payment.session_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                payment.id = self.counter.fetch_add(1, Ordering::SeqCst);
                slot.insert(payment.id);
                self.payments.insert(payment.id, payment.clone());
                Ok(payment)
            }
        }
    }

    async fn update(&self, payment: Payment) -> DomainResult<()> {
        if !self.payments.contains_key(&payment.id) {
            return Err(DomainError::not_found("Payment", "id", payment.id));
        }
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Payment>> {
        Ok(self.payments.get(&id).map(|p| p.clone()))
    }

    async fn find_by_session(&self, session_id: i32) -> DomainResult<Option<Payment>> {
        let Some(id) = self.by_session.get(&session_id).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.payments.get(&id).map(|p| p.clone()))
    }

    async fn find_unattempted(&self) -> DomainResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Unpaid && p.attempted_at.is_none())
            .map(|p| p.clone())
            .collect();
        payments.sort_by_key(|p| p.id);
        Ok(payments)
    }
}

// ── Wallets ─────────────────────────────────────────────────────

pub struct InMemoryWalletRepository {
    wallets: DashMap<i32, Wallet>,
    /// user id -> wallet id
    by_user: DashMap<i32, i32>,
    transactions: DashMap<i32, WalletTransaction>,
    wallet_counter: AtomicI32,
    tx_counter: AtomicI32,
}

impl Default for InMemoryWalletRepository {
    fn default() -> Self {
        Self {
            wallets: DashMap::new(),
            by_user: DashMap::new(),
            transactions: DashMap::new(),
            wallet_counter: AtomicI32::new(1),
            tx_counter: AtomicI32::new(1),
        }
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    async fn create(&self, user_id: i32) -> DomainResult<Wallet> {
        match self.by_user.entry(user_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "User {} already has a wallet",
                user_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let wallet = Wallet {
                    id: self.wallet_counter.fetch_add(1, Ordering::SeqCst),
                    user_id,
                    balance: 0,
                    updated_at: Utc::now(),
                };
                slot.insert(wallet.id);
                self.wallets.insert(wallet.id, wallet.clone());
                Ok(wallet)
            }
        }
    }

    async fn find_by_user(&self, user_id: i32) -> DomainResult<Option<Wallet>> {
        let Some(id) = self.by_user.get(&user_id).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.wallets.get(&id).map(|w| w.clone()))
    }

    async fn apply(
        &self,
        wallet_id: i32,
        entry: LedgerEntry,
    ) -> DomainResult<(Wallet, WalletTransaction)> {
        // Holding the entry guard serializes concurrent applies on this wallet.
        let mut wallet = self
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| DomainError::not_found("Wallet", "id", wallet_id))?;

        let duplicate = self.transactions.iter().any(|t| {
            t.kind == entry.kind
                && ((entry.session_id.is_some() && t.session_id == entry.session_id)
                    || (entry.booking_id.is_some() && t.booking_id == entry.booking_id))
        });
        if duplicate {
            return Err(DomainError::Conflict(format!(
                "{} already recorded for session {:?} / booking {:?}",
                entry.kind.as_str(),
                entry.session_id,
                entry.booking_id
            )));
        }

        let new_balance = wallet.balance + entry.amount;
        if new_balance < 0 {
            return Err(DomainError::InsufficientFunds {
                wallet_id,
                required: -entry.amount,
                available: wallet.balance,
            });
        }

        wallet.balance = new_balance;
        wallet.updated_at = entry.at;

        let tx = WalletTransaction {
            id: self.tx_counter.fetch_add(1, Ordering::SeqCst),
            wallet_id,
            amount: entry.amount,
            kind: entry.kind,
            booking_id: entry.booking_id,
            session_id: entry.session_id,
            balance_after: new_balance,
            description: entry.description,
            created_at: entry.at,
        };
        self.transactions.insert(tx.id, tx.clone());

        Ok((wallet.clone(), tx))
    }

    async fn list_transactions(&self, wallet_id: i32) -> DomainResult<Vec<WalletTransaction>> {
        let mut txs: Vec<WalletTransaction> = self
            .transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .map(|t| t.clone())
            .collect();
        txs.sort_by_key(|t| t.id);
        Ok(txs)
    }

    async fn find_session_transaction(
        &self,
        session_id: i32,
        kind: WalletTransactionKind,
    ) -> DomainResult<Option<WalletTransaction>> {
        Ok(self
            .transactions
            .iter()
            .find(|t| t.session_id == Some(session_id) && t.kind == kind)
            .map(|t| t.clone()))
    }

    async fn find_booking_transaction(
        &self,
        booking_id: i32,
        kind: WalletTransactionKind,
    ) -> DomainResult<Option<WalletTransaction>> {
        Ok(self
            .transactions
            .iter()
            .find(|t| t.booking_id == Some(booking_id) && t.kind == kind)
            .map(|t| t.clone()))
    }
}

// ── Provider ────────────────────────────────────────────────────

/// In-memory repository provider for development and testing
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    charging_points: InMemoryChargingPointRepository,
    vehicles: InMemoryVehicleRepository,
    billing_plans: InMemoryBillingPlanRepository,
    bookings: InMemoryBookingRepository,
    sessions: InMemorySessionRepository,
    payments: InMemoryPaymentRepository,
    wallets: InMemoryWalletRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn charging_points(&self) -> &dyn ChargingPointRepository {
        &self.charging_points
    }

    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn billing_plans(&self) -> &dyn BillingPlanRepository {
        &self.billing_plans
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn wallets(&self) -> &dyn WalletRepository {
        &self.wallets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overdraft_is_rejected_and_balance_unchanged() {
        let repos = InMemoryRepositoryProvider::new();
        let wallet = repos.wallets().create(1).await.unwrap();
        repos
            .wallets()
            .apply(
                wallet.id,
                LedgerEntry::credit(10_000, WalletTransactionKind::TopUp, Utc::now()),
            )
            .await
            .unwrap();

        let err = repos
            .wallets()
            .apply(
                wallet.id,
                LedgerEntry::debit(30_000, WalletTransactionKind::SessionCharge, Utc::now()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds { .. }));

        let wallet = repos.wallets().find_by_user(1).await.unwrap().unwrap();
        assert_eq!(wallet.balance, 10_000);
        assert_eq!(repos.wallets().list_transactions(wallet.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn session_entry_of_a_kind_is_recorded_once() {
        let repos = InMemoryRepositoryProvider::new();
        let wallet = repos.wallets().create(1).await.unwrap();
        let now = Utc::now();
        repos
            .wallets()
            .apply(wallet.id, LedgerEntry::credit(10_000, WalletTransactionKind::TopUp, now))
            .await
            .unwrap();
        let charge = LedgerEntry::debit(4_000, WalletTransactionKind::SessionCharge, now).for_session(3);
        repos.wallets().apply(wallet.id, charge.clone()).await.unwrap();

        let err = repos.wallets().apply(wallet.id, charge).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // other kinds on the same session still go through
        repos
            .wallets()
            .apply(
                wallet.id,
                LedgerEntry::credit(500, WalletTransactionKind::SettlementRefund, now).for_session(3),
            )
            .await
            .unwrap();
        let wallet = repos.wallets().find_by_user(1).await.unwrap().unwrap();
        assert_eq!(wallet.balance, 6_500);
    }

    #[tokio::test]
    async fn one_payment_per_session() {
        let repos = InMemoryRepositoryProvider::new();
        let now = Utc::now();
        repos.payments().create(Payment::unpaid(1, 9, 100, now)).await.unwrap();
        let err = repos
            .payments()
            .create(Payment::unpaid(1, 9, 100, now))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn next_booking_id_skips_saved_ids() {
        let repos = InMemoryRepositoryProvider::new();
        let now = Utc::now();
        let id = repos.bookings().next_id().await.unwrap();
        assert_eq!(id, 1);
        repos
            .bookings()
            .save(Booking::new(5, 1, 1, 1, now, now, 80, 50_000, now))
            .await
            .unwrap();
        assert_eq!(repos.bookings().next_id().await.unwrap(), 6);
    }
}
