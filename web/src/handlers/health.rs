//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, http::StatusCode};
use serde::Serialize;
use ticketing_core::store::TicketStore;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness report returned by [`readiness_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// Component checked
    pub component: &'static str,
    /// `ready` or `unavailable`
    pub status: &'static str,
    /// Failure detail, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness check against the ticket store.
///
/// # Status Codes
///
/// - 200 OK: the store answered a ping
/// - 503 Service Unavailable: it did not
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check(store: &dyn TicketStore) -> (StatusCode, Json<Readiness>) {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Readiness {
                component: "ticket_store",
                status: "ready",
                message: None,
            }),
        ),
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    component: "ticket_store",
                    status: "unavailable",
                    message: Some(error.to_string()),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketing_testing::InMemoryTicketStore;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_ready_when_store_answers() {
        let store = InMemoryTicketStore::new();

        let (status, Json(report)) = readiness_check(&store).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, "ready");
    }

    #[tokio::test]
    async fn test_unavailable_when_store_down() {
        let store = InMemoryTicketStore::new();
        store.set_unavailable(true);

        let (status, Json(report)) = readiness_check(&store).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(report.message.is_some());
    }
}
