//! # Ticketing Testing
//!
//! Testing utilities for the ticket reservation engine.
//!
//! This crate provides:
//! - `FixedClock` and `ManualClock`: deterministic time
//! - `InMemoryTicketStore`: a `TicketStore` fake with transaction semantics
//!   and fault injection
//!
//! ## Example
//!
//! ```ignore
//! use ticketing_testing::{InMemoryTicketStore, ManualClock, test_clock};
//!
//! #[tokio::test]
//! async fn hold_lapses() {
//!     let clock = ManualClock::starting_at(test_clock().now());
//!     let store = InMemoryTicketStore::new();
//!     // ... reserve, then
//!     clock.advance(chrono::Duration::minutes(11));
//!     // ... reserve again with the same tickets
//! }
//! ```

use chrono::{DateTime, Utc};
use ticketing_core::environment::Clock;

mod in_memory;

pub use in_memory::InMemoryTicketStore;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketing_testing::mocks::FixedClock;
    /// use ticketing_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the service under test.
    ///
    /// ```
    /// use ticketing_testing::mocks::ManualClock;
    /// use ticketing_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = ManualClock::starting_at(Utc::now());
    /// let start = clock.now();
    /// clock.advance(Duration::minutes(10));
    /// assert_eq!(clock.now() - start, Duration::minutes(10));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move time forward
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(test_clock().now());
        let handle = clock.clone();

        handle.advance(Duration::seconds(601));

        assert_eq!(clock.now(), test_clock().now() + Duration::seconds(601));
    }
}
