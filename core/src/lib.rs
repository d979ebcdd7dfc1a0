//! # Ticketing Core
//!
//! Domain types, error taxonomy and storage abstractions for the ticket
//! reservation engine.
//!
//! The engine allocates a finite, numbered pool of tickets per event to
//! competing buyers without overselling. All correctness lives in the storage
//! layer's transactions: this crate only describes *what* a transaction must be
//! able to do ([`store::TicketTransaction`]) and the pure predicates both
//! backends share ([`types::ticket_is_eligible`], [`types::Reservation::state`]).
//!
//! # Lifecycle
//!
//! ```text
//!               reserve (locked, all-or-nothing)
//!  Available ───────────────────────────────────▶ Held ──finalize(Approved)──▶ Sold
//!      ▲                                           │
//!      └──────── lapse (expiry passed, lazy) ──────┘
//! ```
//!
//! There is no sweeper. A held ticket whose reservation has expired is simply
//! eligible again the next time a selection query runs.
//!
//! # Implementations
//!
//! - `PostgresTicketStore` (in `ticketing-postgres`): production, row locks via `FOR UPDATE`
//! - `InMemoryTicketStore` (in `ticketing-testing`): deterministic tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod store;
pub mod types;

pub use error::{StoreError, TicketingError};
pub use store::{BoxFuture, TicketStore, TicketTransaction};

/// Environment abstractions injected into services.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Every expiry comparison in the engine goes through a `Clock`, never
    /// through the database's own notion of "now", so tests can move time.
    ///
    /// # Examples
    ///
    /// ```
    /// use ticketing_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }
}
