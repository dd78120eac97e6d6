//! Shared wiring for service tests: in-memory store, manual clock and a
//! fully assembled service graph.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::{
    AvailabilityService, BookingService, ChargingSessionService, SessionSimulator,
    SettlementService, StatusProjector, WalletService,
};
use crate::application::events::{create_event_bus, SharedEventBus};
use crate::config::BookingPolicy;
use crate::domain::{BillingPlan, ChargingPoint, RepositoryProvider, Vehicle, Wallet};
use crate::infrastructure::InMemoryRepositoryProvider;
use crate::shared::clock::{ManualClock, SharedClock};
use crate::shared::retry::tests::RecordingSleeper;
use crate::shared::retry::RetryConfig;

pub(crate) struct Fixture {
    pub repos: Arc<dyn RepositoryProvider>,
    pub clock: ManualClock,
    pub bus: SharedEventBus,
    pub policy: BookingPolicy,
    pub sleeper: Arc<RecordingSleeper>,
    pub wallets: Arc<WalletService>,
    pub availability: Arc<AvailabilityService>,
    pub projector: Arc<StatusProjector>,
    pub bookings: Arc<BookingService>,
    pub sessions: Arc<ChargingSessionService>,
    pub simulator: Arc<SessionSimulator>,
    pub settlement: Arc<SettlementService>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_repos(Arc::new(InMemoryRepositoryProvider::new()))
    }

    pub fn with_repos(repos: Arc<dyn RepositoryProvider>) -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap());
        let shared_clock: SharedClock = Arc::new(clock.clone());
        let bus = create_event_bus();
        let policy = BookingPolicy::default();
        let sleeper = Arc::new(RecordingSleeper::default());

        let wallets = Arc::new(WalletService::new(repos.clone(), shared_clock.clone()));
        let availability = Arc::new(AvailabilityService::new(
            repos.clone(),
            shared_clock.clone(),
            policy.clone(),
        ));
        let projector = Arc::new(StatusProjector::new(
            repos.clone(),
            availability.clone(),
            shared_clock.clone(),
        ));
        let bookings = Arc::new(BookingService::new(
            repos.clone(),
            availability.clone(),
            projector.clone(),
            bus.clone(),
            shared_clock.clone(),
        ));
        let sessions = Arc::new(ChargingSessionService::new(
            repos.clone(),
            availability.clone(),
            bus.clone(),
            shared_clock.clone(),
        ));
        let simulator = Arc::new(SessionSimulator::new(repos.clone(), sessions.clone(), 6.0));
        let settlement = Arc::new(SettlementService::new(
            repos.clone(),
            bus.clone(),
            shared_clock,
            RetryConfig::default(),
            sleeper.clone(),
        ));

        Self {
            repos,
            clock,
            bus,
            policy,
            sleeper,
            wallets,
            availability,
            projector,
            bookings,
            sessions,
            simulator,
            settlement,
        }
    }

    pub async fn point(&self, id: i32, rated_power_kw: f64) -> ChargingPoint {
        let point = ChargingPoint::new(id, 1, format!("P{id}"), rated_power_kw);
        self.repos.charging_points().save(point.clone()).await.unwrap();
        point
    }

    pub async fn vehicle(
        &self,
        id: i32,
        owner_id: i32,
        battery_capacity_kwh: f64,
        max_charging_power_kw: f64,
        soc: i32,
    ) -> Vehicle {
        let vehicle = Vehicle {
            id,
            owner_id,
            name: format!("EV{id}"),
            battery_capacity_kwh,
            max_charging_power_kw,
            current_soc_percent: soc,
        };
        self.repos.vehicles().save(vehicle.clone()).await.unwrap();
        vehicle
    }

    pub async fn plan(&self, price_per_kwh: i64, price_per_minute: i64) -> BillingPlan {
        let plan = BillingPlan {
            id: 1,
            name: "Standard".into(),
            price_per_kwh,
            price_per_minute,
            is_active: true,
        };
        self.repos.billing_plans().save(plan.clone()).await.unwrap();
        plan
    }

    pub async fn fund(&self, user_id: i32, amount: i64) -> Wallet {
        self.wallets.top_up(user_id, amount).await.unwrap()
    }

    pub async fn balance(&self, user_id: i32) -> i64 {
        self.wallets.get_wallet(user_id).await.unwrap().balance
    }
}
