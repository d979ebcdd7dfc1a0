//! Finalizer: applies payment outcomes to reservations.
//!
//! Approval sells the reservation's tickets even if the hold has lapsed, as
//! long as nobody reclaimed any of them in the meantime. If another buyer did,
//! the approval is refused with `ReservationReclaimed` and nothing is sold:
//! a ticket that belongs to a newer reservation is never taken back, and a
//! reservation is never partially sold.
//!
//! A decline changes nothing. The tickets stay held until the hold lapses.

use super::log_failure;
use crate::metrics;
use std::sync::Arc;
use ticketing_core::environment::Clock;
use ticketing_core::error::TicketingError;
use ticketing_core::store::TicketStore;
use ticketing_core::types::{Finalization, PaymentOutcome, ReservationId, TicketStatus};

/// Resolves reservations from payment outcomes. Safe to call repeatedly.
pub struct Finalizer {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
}

impl Finalizer {
    /// Create a finalizer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Apply `outcome` to `reservation_id`.
    ///
    /// # Errors
    ///
    /// - `ReservationNotFound`: no such reservation
    /// - `ReservationReclaimed`: approval arrived after some of the tickets
    ///   were reallocated; nothing was sold
    /// - `Store`: transaction failed; nothing was applied
    pub async fn finalize(
        &self,
        reservation_id: ReservationId,
        outcome: PaymentOutcome,
    ) -> Result<Finalization, TicketingError> {
        let result = match outcome {
            PaymentOutcome::Approved => self.approve(reservation_id).await,
            PaymentOutcome::Declined => self.decline(reservation_id).await,
        };

        match &result {
            Ok(finalization) => tracing::info!(
                reservation_id = %reservation_id,
                outcome = %outcome,
                result = ?finalization,
                "Payment outcome applied"
            ),
            Err(error @ TicketingError::ReservationReclaimed(_)) => {
                metrics::record_finalization("reclaimed", 0);
                log_failure("finalize", error);
            }
            Err(error) => log_failure("finalize", error),
        }
        result
    }

    async fn approve(&self, reservation_id: ReservationId) -> Result<Finalization, TicketingError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let reservation = tx
            .find_reservation(reservation_id)
            .await?
            .ok_or(TicketingError::ReservationNotFound(reservation_id))?;

        let bound = tx.lock_reservation_tickets(reservation_id).await?;
        let bound_count = u64::try_from(bound.len()).unwrap_or(u64::MAX);

        if bound_count < u64::from(reservation.ticket_count) {
            tracing::warn!(
                reservation_id = %reservation_id,
                user_id = %reservation.user_id,
                expected = reservation.ticket_count,
                still_bound = bound_count,
                "Approval for a reservation whose tickets were reallocated"
            );
            return Err(TicketingError::ReservationReclaimed(reservation_id));
        }

        if bound.iter().all(|t| t.status == TicketStatus::Sold) {
            if let Err(error) = tx.rollback().await {
                tracing::warn!(error = %error, "Rollback after repeated approval failed");
            }
            metrics::record_finalization("already_sold", 0);
            return Ok(Finalization::AlreadySold {
                tickets: bound_count,
            });
        }

        if reservation.is_expired(now) {
            tracing::info!(
                reservation_id = %reservation_id,
                expired_at = %reservation.expires_at,
                "Approval arrived after the hold lapsed; tickets were not reallocated, selling"
            );
        }

        let sold = tx.sell_tickets(reservation_id).await?;
        tx.commit().await?;

        metrics::record_finalization("sold", sold);
        Ok(Finalization::Sold { tickets: sold })
    }

    async fn decline(&self, reservation_id: ReservationId) -> Result<Finalization, TicketingError> {
        self.store
            .reservation_snapshot(reservation_id)
            .await?
            .ok_or(TicketingError::ReservationNotFound(reservation_id))?;

        metrics::record_finalization("declined", 0);
        Ok(Finalization::Declined)
    }
}
