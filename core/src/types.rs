//! Domain types for the ticket reservation engine.
//!
//! Events own a fixed set of numbered tickets. Reservations bind a fixed number
//! of those tickets to a buyer until an expiry. A reservation carries no status
//! column: whether it is active, lapsed, paid or released is derived from the
//! tickets that still reference it (see [`Reservation::state`]).

use crate::error::{StoreError, TicketingError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the buyer holding a reservation.
///
/// Opaque to the engine. The only rule is that it is not blank, which is
/// what [`UserId::parse`] enforces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Parse a user identifier from the authenticated context.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Unauthenticated`] if the identifier is empty
    /// or whitespace only.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TicketingError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TicketingError::Unauthenticated);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A scheduled event with a declared ticket capacity.
///
/// Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Display name
    pub name: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Number of tickets provisioned for the event
    pub capacity: u32,
}

impl Event {
    /// Creates a new `Event` with a fresh identifier
    #[must_use]
    pub fn new(name: String, date: DateTime<Utc>, capacity: u32) -> Self {
        Self {
            id: EventId::new(),
            name,
            date,
            capacity,
        }
    }

    /// Build the complete ticket set for this event: `1..=capacity`, all available.
    #[must_use]
    pub fn provision_tickets(&self) -> Vec<Ticket> {
        (1..=self.capacity)
            .map(|number| Ticket::available(self.id, number))
            .collect()
    }
}

/// Ticket status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Free for reservation
    Available,
    /// Bound to a reservation (effectively free again once it lapses)
    Held,
    /// Paid for. Terminal.
    Sold,
}

impl TicketStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Held => "held",
            Self::Sold => "sold",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "available" => Ok(Self::Available),
            "held" => Ok(Self::Held),
            "sold" => Ok(Self::Sold),
            _ => Err(StoreError::Corrupt(format!("Invalid ticket status: {s}"))),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single numbered ticket of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket identifier
    pub id: TicketId,
    /// Owning event
    pub event_id: EventId,
    /// 1-based number, unique within the event
    pub ticket_number: u32,
    /// Current status
    pub status: TicketStatus,
    /// Reservation the ticket is bound to (`Held`), or was sold under (`Sold`)
    pub reservation_id: Option<ReservationId>,
}

impl Ticket {
    /// Creates an unbound, available ticket
    #[must_use]
    pub fn available(event_id: EventId, ticket_number: u32) -> Self {
        Self {
            id: TicketId::new(),
            event_id,
            ticket_number,
            status: TicketStatus::Available,
            reservation_id: None,
        }
    }

    /// Whether this ticket is currently bound to `reservation_id`.
    #[must_use]
    pub fn is_bound_to(&self, reservation_id: ReservationId) -> bool {
        self.reservation_id == Some(reservation_id)
    }
}

/// Eligibility predicate shared by allocation and the inventory view.
///
/// A ticket is eligible when it is `Available`, or `Held` by a reservation whose
/// expiry has passed. `binding_expiry` is the expiry of the reservation the
/// ticket currently points at, if any.
#[must_use]
pub fn ticket_is_eligible(
    ticket: &Ticket,
    binding_expiry: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match ticket.status {
        TicketStatus::Available => true,
        TicketStatus::Held => binding_expiry.is_some_and(|expires_at| now >= expires_at),
        TicketStatus::Sold => false,
    }
}

/// A time-bounded hold on a fixed number of tickets.
///
/// Written once by the coordinator and never updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier
    pub id: ReservationId,
    /// Buyer holding the tickets
    pub user_id: UserId,
    /// Event the tickets belong to
    pub event_id: EventId,
    /// Number of tickets bound at creation
    pub ticket_count: u32,
    /// When the hold was taken
    pub created_at: DateTime<Utc>,
    /// When the hold lapses
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a new reservation starting at `now` and lasting `hold_duration`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        event_id: EventId,
        ticket_count: u32,
        now: DateTime<Utc>,
        hold_duration: Duration,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            user_id,
            event_id,
            ticket_count,
            created_at: now,
            expires_at: now + hold_duration,
        }
    }

    /// Checks if the hold has lapsed
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Derive the reservation's resolution state from its tickets.
    ///
    /// `tickets` may contain unrelated tickets; only those still bound to this
    /// reservation are considered.
    #[must_use]
    pub fn state(&self, tickets: &[Ticket], now: DateTime<Utc>) -> ReservationState {
        let bound: Vec<&Ticket> = tickets.iter().filter(|t| t.is_bound_to(self.id)).collect();

        if bound.is_empty() {
            return ReservationState::Released;
        }
        if bound.len() == self.ticket_count as usize
            && bound.iter().all(|t| t.status == TicketStatus::Sold)
        {
            return ReservationState::Paid;
        }
        if self.is_expired(now) {
            ReservationState::Lapsed
        } else {
            ReservationState::Active
        }
    }
}

/// Derived resolution state of a reservation. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    /// Expiry in the future, tickets held
    Active,
    /// Expiry passed, some tickets still bound but reclaimable
    Lapsed,
    /// Tickets sold
    Paid,
    /// No ticket references the reservation any more
    Released,
}

// ============================================================================
// Allocation policy
// ============================================================================

/// How the coordinator acquires row locks on candidate tickets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
    /// Block on candidates locked by another transaction (`FOR UPDATE`)
    #[default]
    Wait,
    /// Skip locked candidates and look further down the list (`FOR UPDATE SKIP LOCKED`).
    ///
    /// Higher throughput, at the price of an occasional false
    /// `InsufficientInventory` while another buyer's transaction is in flight.
    SkipLocked,
}

impl FromStr for LockStrategy {
    type Err = TicketingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wait" => Ok(Self::Wait),
            "skip_locked" | "skip-locked" => Ok(Self::SkipLocked),
            other => Err(TicketingError::InvalidInput(format!(
                "Unknown lock strategy: {other}"
            ))),
        }
    }
}

// ============================================================================
// Payment outcome
// ============================================================================

/// External payment result delivered to the finalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Payment captured; tickets become sold
    Approved,
    /// Payment refused; tickets stay held until they lapse
    Declined,
}

impl PaymentOutcome {
    /// Wire code used by the payment webhook for approvals
    pub const APPROVED_CODE: i64 = 1;
    /// Wire code used by the payment webhook for declines
    pub const DECLINED_CODE: i64 = 2;

    /// Decode a numeric webhook status.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidOutcome`] for any other code.
    pub fn from_code(code: i64) -> Result<Self, TicketingError> {
        match code {
            Self::APPROVED_CODE => Ok(Self::Approved),
            Self::DECLINED_CODE => Ok(Self::Declined),
            other => Err(TicketingError::InvalidOutcome(other.to_string())),
        }
    }
}

impl FromStr for PaymentOutcome {
    type Err = TicketingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            _ => Err(TicketingError::InvalidOutcome(s.to_string())),
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => f.write_str("approved"),
            Self::Declined => f.write_str("declined"),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Point-in-time inventory view of an event. Display only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAvailability {
    /// The event
    pub event: Event,
    /// Tickets that are available or held by a lapsed reservation
    pub available_count: u32,
}

/// Successful reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationReceipt {
    /// New reservation identifier
    pub reservation_id: ReservationId,
    /// Event reserved
    pub event_id: EventId,
    /// Tickets bound
    pub ticket_count: u32,
    /// When the hold lapses
    pub expires_at: DateTime<Utc>,
}

/// What the finalizer did with a payment outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Finalization {
    /// Held tickets moved to sold
    Sold {
        /// Number of tickets sold by this call
        tickets: u64,
    },
    /// A previous approval already sold every ticket; nothing changed
    AlreadySold {
        /// Number of tickets sold under the reservation
        tickets: u64,
    },
    /// Decline recorded; tickets left to lapse
    Declined,
}

/// A reservation together with its derived state and bound ticket numbers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationView {
    /// The stored reservation
    pub reservation: Reservation,
    /// Derived state at read time
    pub state: ReservationState,
    /// Numbers of the tickets still bound to it, ascending
    pub ticket_numbers: Vec<u32>,
}
