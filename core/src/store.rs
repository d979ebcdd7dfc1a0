//! Storage capability traits for the reservation engine.
//!
//! The coordinator and finalizer never talk to a database directly. They open a
//! [`TicketTransaction`] through a [`TicketStore`], issue a handful of
//! capability calls, and commit. Everything the no-oversell guarantee needs
//! (row locks, atomic commit, rollback on drop) is the backend's job.
//!
//! # Contract for implementations
//!
//! - A transaction is all-or-nothing. Dropping it without [`TicketTransaction::commit`]
//!   must discard every write made through it.
//! - [`TicketTransaction::lock_eligible_tickets`] must hold an exclusive lock on
//!   every returned ticket until the transaction ends, so a concurrent
//!   transaction either waits for it or (with [`LockStrategy::SkipLocked`])
//!   passes it over. After acquiring the lock it must re-check eligibility
//!   against the committed state.
//! - All expiry comparisons use the `now` passed in, never a backend clock.
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] instead of using `async fn` so the traits can be
//! used as `Arc<dyn TicketStore>` and `Box<dyn TicketTransaction>`.

use crate::error::StoreError;
use crate::types::{
    Event, EventAvailability, EventId, LockStrategy, Reservation, ReservationId, Ticket, TicketId,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by the storage traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type alias for a reservation and the tickets currently bound to it.
pub type ReservationSnapshot = (Reservation, Vec<Ticket>);

/// Entry point to a ticket storage backend.
pub trait TicketStore: Send + Sync {
    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend unreachable or pool exhausted
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn TicketTransaction>, StoreError>>;

    /// Read an event with its available ticket count, evaluated at `now`.
    ///
    /// Takes no locks. The count is a point-in-time display value and must
    /// never be used to authorize a reservation.
    ///
    /// # Errors
    ///
    /// - `Database`/`Unavailable`: query failed
    fn event_availability(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Option<EventAvailability>, StoreError>>;

    /// List all events, most recent date first.
    ///
    /// # Errors
    ///
    /// - `Database`/`Unavailable`: query failed
    fn list_events(&self) -> BoxFuture<'_, Result<Vec<Event>, StoreError>>;

    /// Read a reservation and the tickets still bound to it. No locks.
    ///
    /// # Errors
    ///
    /// - `Database`/`Unavailable`: query failed
    fn reservation_snapshot(
        &self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Option<ReservationSnapshot>, StoreError>>;

    /// Cheap connectivity check for readiness probes.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend unreachable
    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// One open transaction against the ticket store.
///
/// Consumed by [`commit`](Self::commit) or [`rollback`](Self::rollback);
/// dropped transactions roll back.
pub trait TicketTransaction: Send {
    /// Insert an event row.
    ///
    /// # Errors
    ///
    /// - `Database`: insert failed (e.g. duplicate id)
    fn insert_event(&mut self, event: Event) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Bulk insert tickets.
    ///
    /// # Errors
    ///
    /// - `Database`: insert failed (e.g. duplicate ticket number)
    fn insert_tickets(&mut self, tickets: Vec<Ticket>) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Whether the event exists.
    ///
    /// # Errors
    ///
    /// - `Database`: query failed
    fn event_exists(&mut self, event_id: EventId) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Select up to `limit` eligible tickets of the event, ordered by ticket
    /// number, and lock them for the rest of the transaction.
    ///
    /// Eligible means `Available`, or `Held` by a reservation whose expiry is at
    /// or before `now`.
    ///
    /// # Errors
    ///
    /// - `LockTimeout`: gave up waiting for a competing transaction
    /// - `Database`: query failed
    fn lock_eligible_tickets(
        &mut self,
        event_id: EventId,
        now: DateTime<Utc>,
        limit: u32,
        strategy: LockStrategy,
    ) -> BoxFuture<'_, Result<Vec<TicketId>, StoreError>>;

    /// Insert a reservation row.
    ///
    /// # Errors
    ///
    /// - `Database`: insert failed
    fn insert_reservation(
        &mut self,
        reservation: Reservation,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Mark the given tickets `Held` and bind them to the reservation,
    /// overwriting any stale binding. Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// - `Database`: update failed
    fn hold_tickets(
        &mut self,
        reservation_id: ReservationId,
        ticket_ids: Vec<TicketId>,
    ) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Load a reservation.
    ///
    /// # Errors
    ///
    /// - `Database`: query failed
    fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Option<Reservation>, StoreError>>;

    /// Lock and return every ticket currently bound to the reservation,
    /// ordered by ticket number.
    ///
    /// # Errors
    ///
    /// - `LockTimeout`: gave up waiting for a competing transaction
    /// - `Database`: query failed
    fn lock_reservation_tickets(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Vec<Ticket>, StoreError>>;

    /// Move every `Held` ticket bound to the reservation to `Sold`.
    /// Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// - `Database`: update failed
    fn sell_tickets(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Commit every write made through this transaction.
    ///
    /// # Errors
    ///
    /// - `Conflict`/`Unavailable`: commit failed, nothing was applied
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>>;

    /// Discard every write made through this transaction.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: connection lost (the backend discards the writes anyway)
    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>>;
}
