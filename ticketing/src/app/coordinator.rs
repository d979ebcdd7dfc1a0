//! Reservation Coordinator.
//!
//! `reserve` is one transaction:
//!
//! 1. lock up to `count` eligible tickets of the event, lowest numbers first
//!    (available, or held by a lapsed reservation)
//! 2. if fewer than `count` were locked, roll back: `InsufficientInventory`
//! 3. insert the reservation and bind exactly the locked tickets to it
//! 4. commit
//!
//! Step 2 runs while the locks from step 1 are held, so "I found N tickets"
//! and "I may take N tickets" are the same fact. Lapsed holds are reclaimed
//! here, by the selection itself; nothing else ever releases a ticket.

use super::log_failure;
use crate::config::ReservationConfig;
use crate::metrics;
use chrono::Duration;
use std::sync::Arc;
use ticketing_core::environment::Clock;
use ticketing_core::error::{StoreError, TicketingError};
use ticketing_core::store::TicketStore;
use ticketing_core::types::{EventId, LockStrategy, Reservation, ReservationReceipt, UserId};

/// Tunables for the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// How long a hold lasts
    pub hold_duration: Duration,
    /// Blocking or skip-locked candidate acquisition
    pub lock_strategy: LockStrategy,
    /// Upper bound on `count`, if any
    pub max_tickets: Option<u32>,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            hold_duration: Duration::minutes(10),
            lock_strategy: LockStrategy::Wait,
            max_tickets: None,
        }
    }
}

impl From<&ReservationConfig> for ReservationPolicy {
    fn from(config: &ReservationConfig) -> Self {
        Self {
            hold_duration: config.hold_duration(),
            lock_strategy: config.lock_strategy,
            max_tickets: config.max_tickets(),
        }
    }
}

impl ReservationPolicy {
    fn validate_count(&self, count: u32) -> Result<(), TicketingError> {
        if count == 0 {
            return Err(TicketingError::InvalidInput(
                "Ticket count must be at least 1".to_string(),
            ));
        }
        if let Some(max) = self.max_tickets {
            if count > max {
                return Err(TicketingError::InvalidInput(format!(
                    "At most {max} tickets per reservation, requested {count}"
                )));
            }
        }
        Ok(())
    }
}

/// Allocates tickets to buyers, all-or-nothing.
pub struct ReservationCoordinator {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    policy: ReservationPolicy,
}

impl ReservationCoordinator {
    /// Create a coordinator over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        policy: ReservationPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// The policy in force.
    #[must_use]
    pub const fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    /// Hold `count` tickets of `event_id` for `user_id`.
    ///
    /// Either exactly `count` tickets end up bound to the returned
    /// reservation or nothing changes. Cancelling the returned future before
    /// it completes drops the open transaction, which rolls it back.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: blank `user_id`
    /// - `InvalidInput`: `count` is zero or above the configured cap
    /// - `EventNotFound`: no such event
    /// - `InsufficientInventory`: fewer than `count` eligible tickets could be locked
    /// - `Store`: transaction failed; nothing was applied and the call may be retried
    ///   if the error is transient
    pub async fn reserve(
        &self,
        event_id: EventId,
        user_id: &str,
        count: u32,
    ) -> Result<ReservationReceipt, TicketingError> {
        let result = self.try_reserve(event_id, user_id, count).await;
        if let Err(error) = &result {
            log_failure("reserve", error);
        }
        result
    }

    async fn try_reserve(
        &self,
        event_id: EventId,
        user_id: &str,
        count: u32,
    ) -> Result<ReservationReceipt, TicketingError> {
        let user_id = UserId::parse(user_id)?;
        self.policy.validate_count(count)?;

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        if !tx.event_exists(event_id).await? {
            return Err(TicketingError::EventNotFound(event_id));
        }

        let candidates = tx
            .lock_eligible_tickets(event_id, now, count, self.policy.lock_strategy)
            .await?;

        let locked = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
        if locked < count {
            if let Err(error) = tx.rollback().await {
                tracing::warn!(error = %error, "Rollback after insufficient inventory failed");
            }
            metrics::record_reservation_rejected();
            return Err(TicketingError::InsufficientInventory {
                requested: count,
                available: locked,
            });
        }

        let reservation = Reservation::new(user_id, event_id, count, now, self.policy.hold_duration);
        tx.insert_reservation(reservation.clone()).await?;

        let held = tx.hold_tickets(reservation.id, candidates).await?;
        if held != u64::from(count) {
            // Locked rows cannot vanish; bail out rather than commit a partial hold.
            return Err(StoreError::Database(format!(
                "held {held} of {count} locked tickets for reservation {}",
                reservation.id
            ))
            .into());
        }

        tx.commit().await?;

        metrics::record_reservation_created(count);
        tracing::info!(
            reservation_id = %reservation.id,
            event_id = %event_id,
            user_id = %reservation.user_id,
            count,
            expires_at = %reservation.expires_at,
            "Tickets held"
        );

        Ok(ReservationReceipt {
            reservation_id: reservation.id,
            event_id,
            ticket_count: count,
            expires_at: reservation.expires_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ticketing_testing::{InMemoryTicketStore, test_clock};

    fn coordinator(store: &InMemoryTicketStore, policy: ReservationPolicy) -> ReservationCoordinator {
        ReservationCoordinator::new(Arc::new(store.clone()), Arc::new(test_clock()), policy)
    }

    #[tokio::test]
    async fn test_identity_checked_before_count() {
        let store = InMemoryTicketStore::new();
        let result = coordinator(&store, ReservationPolicy::default())
            .reserve(EventId::new(), "", 0)
            .await;
        assert_eq!(result, Err(TicketingError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_zero_count_is_invalid() {
        let store = InMemoryTicketStore::new();
        let result = coordinator(&store, ReservationPolicy::default())
            .reserve(EventId::new(), "alice", 0)
            .await;
        assert!(matches!(result, Err(TicketingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_cap_enforced() {
        let store = InMemoryTicketStore::new();
        let policy = ReservationPolicy {
            max_tickets: Some(4),
            ..ReservationPolicy::default()
        };
        let result = coordinator(&store, policy)
            .reserve(EventId::new(), "alice", 5)
            .await;
        assert!(matches!(result, Err(TicketingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let store = InMemoryTicketStore::new();
        let event_id = EventId::new();
        let result = coordinator(&store, ReservationPolicy::default())
            .reserve(event_id, "alice", 1)
            .await;
        assert_eq!(result, Err(TicketingError::EventNotFound(event_id)));
        assert_eq!(store.reservation_count().await, 0);
    }

    #[test]
    fn test_policy_from_config() {
        let config = crate::config::Config::default();
        let policy = ReservationPolicy::from(&config.reservations);
        assert_eq!(policy, ReservationPolicy::default());
    }
}
