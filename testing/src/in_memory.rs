//! In-memory `TicketStore` for tests.
//!
//! Transactions take the store-wide lock for their whole lifetime and work on a
//! private copy of the tables, which is swapped in on commit. That is coarser
//! than row locking but gives the same guarantees the engine relies on:
//! serialized access to candidate tickets, and all-or-nothing commits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use ticketing_core::error::StoreError;
use ticketing_core::store::{BoxFuture, ReservationSnapshot, TicketStore, TicketTransaction};
use ticketing_core::types::{
    Event, EventAvailability, EventId, LockStrategy, Reservation, ReservationId, Ticket, TicketId,
    TicketStatus, ticket_is_eligible,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    tickets: HashMap<TicketId, Ticket>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl Tables {
    fn binding_expiry(&self, ticket: &Ticket) -> Option<DateTime<Utc>> {
        ticket
            .reservation_id
            .and_then(|id| self.reservations.get(&id))
            .map(|r| r.expires_at)
    }

    fn event_tickets(&self, event_id: EventId) -> Vec<&Ticket> {
        let mut tickets: Vec<&Ticket> = self
            .tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .collect();
        tickets.sort_by_key(|t| t.ticket_number);
        tickets
    }

    fn bound_tickets(&self, reservation_id: ReservationId) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .values()
            .filter(|t| t.is_bound_to(reservation_id))
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.ticket_number);
        tickets
    }

    #[allow(clippy::cast_possible_truncation)] // bounded by event capacity (u32)
    fn available_count(&self, event_id: EventId, now: DateTime<Utc>) -> u32 {
        self.event_tickets(event_id)
            .into_iter()
            .filter(|t| ticket_is_eligible(t, self.binding_expiry(t), now))
            .count() as u32
    }
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    fail_next_commit: AtomicBool,
}

/// In-memory ticket store with transaction semantics.
///
/// Clones share the same tables.
///
/// # Example
///
/// ```
/// use ticketing_testing::InMemoryTicketStore;
/// use ticketing_core::store::TicketStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryTicketStore::new();
/// assert!(store.list_events().await.unwrap_or_default().is_empty());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryTicketStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `begin` and every read fail with `StoreError::Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next commit fail with `StoreError::Conflict`, discarding its writes.
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// All tickets of an event ordered by ticket number.
    pub async fn tickets_for_event(&self, event_id: EventId) -> Vec<Ticket> {
        let tables = self.tables.lock().await;
        tables
            .event_tickets(event_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of reservation rows ever written.
    pub async fn reservation_count(&self) -> usize {
        self.tables.lock().await.reservations.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl TicketStore for InMemoryTicketStore {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn TicketTransaction>, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            let guard = Arc::clone(&self.tables).lock_owned().await;
            let working = (*guard).clone();
            Ok(Box::new(InMemoryTransaction {
                guard,
                working,
                faults: Arc::clone(&self.faults),
            }) as Box<dyn TicketTransaction>)
        })
    }

    fn event_availability(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Option<EventAvailability>, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            let tables = self.tables.lock().await;
            Ok(tables.events.get(&event_id).map(|event| EventAvailability {
                event: event.clone(),
                available_count: tables.available_count(event_id, now),
            }))
        })
    }

    fn list_events(&self) -> BoxFuture<'_, Result<Vec<Event>, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            let tables = self.tables.lock().await;
            let mut events: Vec<Event> = tables.events.values().cloned().collect();
            events.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(events)
        })
    }

    fn reservation_snapshot(
        &self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Option<ReservationSnapshot>, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            let tables = self.tables.lock().await;
            Ok(tables
                .reservations
                .get(&reservation_id)
                .map(|r| (r.clone(), tables.bound_tickets(reservation_id))))
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move { self.check_available() })
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<Faults>,
}

impl TicketTransaction for InMemoryTransaction {
    fn insert_event(&mut self, event: Event) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            if self.working.events.contains_key(&event.id) {
                return Err(StoreError::Database(format!("duplicate event id {}", event.id)));
            }
            self.working.events.insert(event.id, event);
            Ok(())
        })
    }

    fn insert_tickets(&mut self, tickets: Vec<Ticket>) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut taken: HashSet<(EventId, u32)> = self
                .working
                .tickets
                .values()
                .map(|t| (t.event_id, t.ticket_number))
                .collect();

            for ticket in tickets {
                if !self.working.events.contains_key(&ticket.event_id) {
                    return Err(StoreError::Database(format!(
                        "ticket references unknown event {}",
                        ticket.event_id
                    )));
                }
                if !taken.insert((ticket.event_id, ticket.ticket_number)) {
                    return Err(StoreError::Database(format!(
                        "duplicate ticket number {} for event {}",
                        ticket.ticket_number, ticket.event_id
                    )));
                }
                self.working.tickets.insert(ticket.id, ticket);
            }
            Ok(())
        })
    }

    fn event_exists(&mut self, event_id: EventId) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move { Ok(self.working.events.contains_key(&event_id)) })
    }

    fn lock_eligible_tickets(
        &mut self,
        event_id: EventId,
        now: DateTime<Utc>,
        limit: u32,
        _strategy: LockStrategy,
    ) -> BoxFuture<'_, Result<Vec<TicketId>, StoreError>> {
        // The whole store is already locked by this transaction, so both
        // strategies see the same candidates.
        Box::pin(async move {
            let tables = &self.working;
            Ok(tables
                .event_tickets(event_id)
                .into_iter()
                .filter(|t| ticket_is_eligible(t, tables.binding_expiry(t), now))
                .take(limit as usize)
                .map(|t| t.id)
                .collect())
        })
    }

    fn insert_reservation(
        &mut self,
        reservation: Reservation,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            if !self.working.events.contains_key(&reservation.event_id) {
                return Err(StoreError::Database(format!(
                    "reservation references unknown event {}",
                    reservation.event_id
                )));
            }
            self.working.reservations.insert(reservation.id, reservation);
            Ok(())
        })
    }

    fn hold_tickets(
        &mut self,
        reservation_id: ReservationId,
        ticket_ids: Vec<TicketId>,
    ) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let mut updated = 0;
            for id in ticket_ids {
                if let Some(ticket) = self.working.tickets.get_mut(&id) {
                    ticket.status = TicketStatus::Held;
                    ticket.reservation_id = Some(reservation_id);
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Option<Reservation>, StoreError>> {
        Box::pin(async move { Ok(self.working.reservations.get(&reservation_id).cloned()) })
    }

    fn lock_reservation_tickets(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Vec<Ticket>, StoreError>> {
        Box::pin(async move { Ok(self.working.bound_tickets(reservation_id)) })
    }

    fn sell_tickets(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let mut updated = 0;
            for ticket in self.working.tickets.values_mut() {
                if ticket.is_bound_to(reservation_id) && ticket.status == TicketStatus::Held {
                    ticket.status = TicketStatus::Sold;
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        let Self {
            mut guard,
            working,
            faults,
        } = *self;
        Box::pin(async move {
            if faults.fail_next_commit.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Conflict("injected commit failure".to_string()));
            }
            *guard = working;
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        drop(self);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_clock;
    use ticketing_core::environment::Clock;
    use ticketing_core::types::UserId;

    async fn seeded(capacity: u32) -> (InMemoryTicketStore, Event) {
        let store = InMemoryTicketStore::new();
        let event = Event::new("Show".to_string(), test_clock().now(), capacity);
        let mut tx = store.begin().await.unwrap();
        tx.insert_event(event.clone()).await.unwrap();
        tx.insert_tickets(event.provision_tickets()).await.unwrap();
        tx.commit().await.unwrap();
        (store, event)
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryTicketStore::new();
        let event = Event::new("Show".to_string(), test_clock().now(), 3);
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_event(event.clone()).await.unwrap();
        }
        assert!(store.list_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_commit_failure_discards_writes() {
        let (store, event) = seeded(2).await;
        store.fail_next_commit();

        let mut tx = store.begin().await.unwrap();
        let ids = tx
            .lock_eligible_tickets(event.id, test_clock().now(), 2, LockStrategy::Wait)
            .await
            .unwrap();
        let reservation = Reservation::new(
            UserId::parse("u").unwrap(),
            event.id,
            2,
            test_clock().now(),
            chrono::Duration::minutes(10),
        );
        let reservation_id = reservation.id;
        tx.insert_reservation(reservation).await.unwrap();
        tx.hold_tickets(reservation_id, ids).await.unwrap();
        assert!(matches!(tx.commit().await, Err(StoreError::Conflict(_))));

        let tickets = store.tickets_for_event(event.id).await;
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Available));
        assert_eq!(store.reservation_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_ticket_numbers_are_rejected() {
        let (store, event) = seeded(1).await;
        let mut tx = store.begin().await.unwrap();
        let result = tx
            .insert_tickets(vec![Ticket::available(event.id, 1)])
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn duplicate_numbers_within_one_batch_are_rejected() {
        let (store, event) = seeded(0).await;
        let mut tx = store.begin().await.unwrap();
        let result = tx
            .insert_tickets(vec![
                Ticket::available(event.id, 7),
                Ticket::available(event.id, 7),
            ])
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn same_number_in_another_event_is_fine() {
        let (store, _) = seeded(3).await;
        let other = Event::new("Other".to_string(), test_clock().now(), 3);
        let mut tx = store.begin().await.unwrap();
        tx.insert_event(other.clone()).await.unwrap();
        tx.insert_tickets(other.provision_tickets()).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.tickets_for_event(other.id).await.len(), 3);
    }

    #[tokio::test]
    async fn provisions_a_large_event() {
        let (store, event) = seeded(100_000).await;
        let tickets = store.tickets_for_event(event.id).await;
        assert_eq!(tickets.len(), 100_000);
        assert_eq!(tickets.last().map(|t| t.ticket_number), Some(100_000));
    }

    #[tokio::test]
    async fn unavailable_store_refuses_transactions() {
        let store = InMemoryTicketStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.begin().await, Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);
        assert!(store.begin().await.is_ok());
    }
}
