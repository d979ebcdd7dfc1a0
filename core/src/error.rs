//! Error taxonomy for the reservation engine.
//!
//! Three families, kept apart because callers treat them differently:
//!
//! - **Business outcomes**: expected results reported to the caller
//!   (`InsufficientInventory`, `EventNotFound`, `ReservationNotFound`,
//!   `ReservationReclaimed`). Not faults.
//! - **Integration faults**: the caller broke the contract (`Unauthenticated`,
//!   `InvalidOutcome`, `InvalidInput`). Fail fast.
//! - **Infrastructure faults**: [`StoreError`]. Every mutation is a single
//!   transaction, so a transient fault means nothing was applied and the caller
//!   may retry.

use crate::types::{EventId, ReservationId};
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or connection pool exhausted.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Gave up waiting for a row lock.
    #[error("Lock wait timeout: {0}")]
    LockTimeout(String),

    /// Transaction aborted by the backend (deadlock, serialization failure).
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored data violates a domain invariant.
    #[error("Corrupt data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::LockTimeout(_) | Self::Conflict(_)
        )
    }
}

/// Errors returned by the catalog, coordinator and finalizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    /// Request failed validation (blank name, zero capacity, zero count, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No user identity in the calling context.
    #[error("Missing user identity")]
    Unauthenticated,

    /// Event does not exist.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// Reservation does not exist.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// Fewer eligible tickets than requested. Nothing was held.
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Tickets asked for
        requested: u32,
        /// Eligible tickets that could be locked
        available: u32,
    },

    /// Payment outcome outside `{Approved, Declined}`.
    #[error("Invalid payment outcome: {0}")]
    InvalidOutcome(String),

    /// Approval arrived after some of the reservation's tickets were
    /// reallocated to another buyer. Nothing was sold.
    #[error("Reservation {0} lapsed and its tickets were reallocated")]
    ReservationReclaimed(ReservationId),

    /// Storage failure. Nothing was applied.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TicketingError {
    /// Expected result of a well-formed request, not a fault.
    #[must_use]
    pub const fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            Self::EventNotFound(_)
                | Self::ReservationNotFound(_)
                | Self::InsufficientInventory { .. }
                | Self::ReservationReclaimed(_)
        )
    }

    /// Whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_inventory_display() {
        let error = TicketingError::InsufficientInventory {
            requested: 3,
            available: 1,
        };
        let display = format!("{error}");
        assert!(display.contains("requested 3"));
        assert!(display.contains("available 1"));
    }

    #[test]
    fn transient_store_errors_are_retryable() {
        let lock = TicketingError::from(StoreError::LockTimeout("55P03".to_string()));
        assert!(lock.is_retryable());
        assert!(!lock.is_business_outcome());

        let corrupt = TicketingError::from(StoreError::Corrupt("bad status".to_string()));
        assert!(!corrupt.is_retryable());
    }

    #[test]
    fn business_outcomes_are_not_retryable() {
        let error = TicketingError::EventNotFound(EventId::new());
        assert!(error.is_business_outcome());
        assert!(!error.is_retryable());
        assert!(!TicketingError::Unauthenticated.is_business_outcome());
    }
}
