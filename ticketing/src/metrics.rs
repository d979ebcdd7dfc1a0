//! Business metrics for the ticketing service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticketing_events_created_total` - Events provisioned
//! - `ticketing_reservations_total{status}` - Reserve calls by result (`created`, `rejected`)
//! - `ticketing_tickets_held_total` - Tickets moved to `Held`
//! - `ticketing_tickets_sold_total` - Tickets moved to `Sold`
//! - `ticketing_finalizations_total{outcome}` - Finalize calls by result
//!   (`sold`, `already_sold`, `declined`, `reclaimed`)
//! - `ticketing_store_lock_timeouts_total` - Lock waits abandoned (recorded by the Postgres store)

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Listen address could not be parsed
    #[error("Invalid metrics address {0}")]
    Address(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from inside a Tokio runtime.
///
/// # Errors
///
/// Returns [`MetricsError`] if the address is invalid or a recorder is
/// already installed.
pub fn install_prometheus_exporter(address: &str) -> Result<SocketAddr, MetricsError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| MetricsError::Address(address.to_string()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_business_metrics();
    Ok(addr)
}

/// Initialize and register all business metrics descriptions.
pub fn register_business_metrics() {
    describe_counter!(
        "ticketing_events_created_total",
        "Total number of events provisioned with their ticket set"
    );
    describe_counter!(
        "ticketing_reservations_total",
        "Total number of reserve calls by status (created, rejected)"
    );
    describe_counter!(
        "ticketing_tickets_held_total",
        "Total number of tickets moved to held"
    );
    describe_counter!(
        "ticketing_tickets_sold_total",
        "Total number of tickets sold"
    );
    describe_counter!(
        "ticketing_finalizations_total",
        "Total number of payment outcomes processed, by outcome"
    );
    describe_counter!(
        "ticketing_store_lock_timeouts_total",
        "Total number of transactions that gave up waiting for ticket row locks"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record an event provisioned with `capacity` tickets.
pub fn record_event_created(capacity: u32) {
    metrics::counter!("ticketing_events_created_total").increment(1);
    tracing::debug!(capacity, "Recorded event_created metric");
}

/// Record a successful reservation.
pub fn record_reservation_created(count: u32) {
    metrics::counter!("ticketing_reservations_total", "status" => "created").increment(1);
    metrics::counter!("ticketing_tickets_held_total").increment(u64::from(count));
}

/// Record a reservation refused for lack of inventory.
pub fn record_reservation_rejected() {
    metrics::counter!("ticketing_reservations_total", "status" => "rejected").increment(1);
}

/// Record a processed payment outcome. `tickets_sold` is zero unless this call sold tickets.
pub fn record_finalization(outcome: &'static str, tickets_sold: u64) {
    metrics::counter!("ticketing_finalizations_total", "outcome" => outcome).increment(1);
    if tickets_sold > 0 {
        metrics::counter!("ticketing_tickets_sold_total").increment(tickets_sold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_event_created(10);
        record_reservation_created(2);
        record_reservation_rejected();
        record_finalization("sold", 2);
    }

    #[test]
    fn test_invalid_address() {
        let result = install_prometheus_exporter("not an address");
        assert!(matches!(result, Err(MetricsError::Address(_))));
    }
}
