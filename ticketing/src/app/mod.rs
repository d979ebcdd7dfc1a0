//! Engine services.
//!
//! Each service owns an `Arc<dyn TicketStore>` and an `Arc<dyn Clock>` and
//! nothing else: there is no in-process shared mutable state. Every mutation
//! is one store transaction.
//!
//! - [`EventCatalog`]: provisioning and read paths
//! - [`ReservationCoordinator`]: the locked select-verify-write reservation
//! - [`Finalizer`]: payment outcomes

pub mod catalog;
pub mod coordinator;
pub mod finalizer;

pub use catalog::{EventCatalog, MAX_CAPACITY};
pub use coordinator::{ReservationCoordinator, ReservationPolicy};
pub use finalizer::Finalizer;

use crate::config::ReservationConfig;
use std::sync::Arc;
use ticketing_core::environment::Clock;
use ticketing_core::error::TicketingError;
use ticketing_core::store::TicketStore;

/// The three services wired to one store and clock.
#[derive(Clone)]
pub struct TicketingServices {
    /// Event catalog
    pub catalog: Arc<EventCatalog>,
    /// Reservation coordinator
    pub coordinator: Arc<ReservationCoordinator>,
    /// Finalizer
    pub finalizer: Arc<Finalizer>,
}

impl TicketingServices {
    /// Build the services from a store, a clock and the reservation policy.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        reservations: &ReservationConfig,
    ) -> Self {
        let policy = ReservationPolicy::from(reservations);
        Self {
            catalog: Arc::new(EventCatalog::new(Arc::clone(&store), Arc::clone(&clock))),
            coordinator: Arc::new(ReservationCoordinator::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                policy,
            )),
            finalizer: Arc::new(Finalizer::new(store, clock)),
        }
    }
}

/// Log a failed operation at the level its error family calls for.
///
/// Business outcomes are expected and stay at `info`; contract violations are
/// `warn`; storage faults are `error`.
pub(crate) fn log_failure(operation: &'static str, error: &TicketingError) {
    if error.is_business_outcome() {
        tracing::info!(operation, error = %error, "Operation refused");
    } else if let TicketingError::Store(store) = error {
        tracing::error!(
            operation,
            error = %store,
            retryable = store.is_transient(),
            "Storage failure, nothing was applied"
        );
    } else {
        tracing::warn!(operation, error = %error, "Rejected request");
    }
}
