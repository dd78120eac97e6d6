//! In-memory storage implementations

mod memory;

pub use memory::{
    InMemoryBillingPlanRepository, InMemoryBookingRepository, InMemoryChargingPointRepository,
    InMemoryPaymentRepository, InMemoryRepositoryProvider, InMemorySessionRepository,
    InMemoryVehicleRepository, InMemoryWalletRepository,
};
