//! Application state for the ticketing HTTP server.

use crate::app::{EventCatalog, Finalizer, ReservationCoordinator, TicketingServices};
use crate::config::ReservationConfig;
use std::sync::Arc;
use ticketing_core::environment::Clock;
use ticketing_core::store::TicketStore;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Ticket store, for readiness probes
    pub store: Arc<dyn TicketStore>,
    /// Engine services
    pub services: TicketingServices,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        reservations: &ReservationConfig,
    ) -> Self {
        let services = TicketingServices::new(Arc::clone(&store), clock, reservations);
        Self { store, services }
    }

    /// Event catalog
    #[must_use]
    pub fn catalog(&self) -> &EventCatalog {
        &self.services.catalog
    }

    /// Reservation coordinator
    #[must_use]
    pub fn coordinator(&self) -> &ReservationCoordinator {
        &self.services.coordinator
    }

    /// Finalizer
    #[must_use]
    pub fn finalizer(&self) -> &Finalizer {
        &self.services.finalizer
    }
}
