//! Event Catalog: provisioning and the read paths.

use super::log_failure;
use crate::metrics;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ticketing_core::environment::Clock;
use ticketing_core::error::TicketingError;
use ticketing_core::store::TicketStore;
use ticketing_core::types::{
    Event, EventAvailability, EventId, ReservationId, ReservationView,
};

/// Largest capacity a single event may declare.
pub const MAX_CAPACITY: u32 = 100_000;

/// Creates events with their complete ticket set and serves read-only views.
pub struct EventCatalog {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
}

impl EventCatalog {
    /// Create a catalog over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create an event and its `capacity` tickets, numbered `1..=capacity`,
    /// all available, in one transaction.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: blank name or capacity outside `1..=MAX_CAPACITY`
    /// - `Store`: the transaction failed; no event or ticket was written
    pub async fn create_event(
        &self,
        name: &str,
        date: DateTime<Utc>,
        capacity: u32,
    ) -> Result<Event, TicketingError> {
        let result = self.provision(name, date, capacity).await;
        if let Err(error) = &result {
            log_failure("create_event", error);
        }
        result
    }

    async fn provision(
        &self,
        name: &str,
        date: DateTime<Utc>,
        capacity: u32,
    ) -> Result<Event, TicketingError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TicketingError::InvalidInput(
                "Event name must not be blank".to_string(),
            ));
        }
        if !(1..=MAX_CAPACITY).contains(&capacity) {
            return Err(TicketingError::InvalidInput(format!(
                "Capacity must be between 1 and {MAX_CAPACITY}, got {capacity}"
            )));
        }

        let event = Event::new(name.to_string(), date, capacity);
        let tickets = event.provision_tickets();

        let mut tx = self.store.begin().await?;
        tx.insert_event(event.clone()).await?;
        tx.insert_tickets(tickets).await?;
        tx.commit().await?;

        metrics::record_event_created(capacity);
        tracing::info!(
            event_id = %event.id,
            name = %event.name,
            capacity,
            "Event created with its ticket set"
        );
        Ok(event)
    }

    /// Point-in-time inventory view. Display only, never an authorization.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`: no such event
    /// - `Store`: the read failed
    pub async fn get_event(&self, event_id: EventId) -> Result<EventAvailability, TicketingError> {
        let now = self.clock.now();
        self.store
            .event_availability(event_id, now)
            .await?
            .ok_or(TicketingError::EventNotFound(event_id))
    }

    /// All events, newest date first.
    ///
    /// # Errors
    ///
    /// - `Store`: the read failed
    pub async fn list_events(&self) -> Result<Vec<Event>, TicketingError> {
        Ok(self.store.list_events().await?)
    }

    /// A reservation with its derived state and the numbers of the tickets
    /// still bound to it.
    ///
    /// # Errors
    ///
    /// - `ReservationNotFound`: no such reservation
    /// - `Store`: the read failed
    pub async fn get_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<ReservationView, TicketingError> {
        let now = self.clock.now();
        let (reservation, tickets) = self
            .store
            .reservation_snapshot(reservation_id)
            .await?
            .ok_or(TicketingError::ReservationNotFound(reservation_id))?;

        let state = reservation.state(&tickets, now);
        let mut ticket_numbers: Vec<u32> = tickets
            .iter()
            .filter(|t| t.is_bound_to(reservation_id))
            .map(|t| t.ticket_number)
            .collect();
        ticket_numbers.sort_unstable();

        Ok(ReservationView {
            reservation,
            state,
            ticket_numbers,
        })
    }
}
