//! Request tracking middleware.
//!
//! [`correlation_id_layer`] gives every request an `http_request` span carrying
//! a correlation ID and, when present, the buyer's `X-User-Id`, so every log
//! line a reservation or finalization emits can be tied back to one request.
//!
//! # Flow
//!
//! 1. **Extract** correlation ID from `X-Correlation-ID` header (or generate new UUID)
//! 2. **Store** in request extensions for handler access
//! 3. **Run** the handler inside the `http_request` span
//! 4. **Log** status and latency, then echo the correlation ID in the response
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use ticketing_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/api/events", get(list_events))
//!     .layer(correlation_id_layer());
//! ```

use crate::extractors::USER_ID_HEADER;
use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("-")
            .to_string();

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            user_id = %user_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let mut response = fut.await?;

                tracing::debug!(
                    status = response.status().as_u16(),
                    latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Request completed"
                );

                if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                    response
                        .headers_mut()
                        .insert(CORRELATION_ID_HEADER, header_value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        let correlation_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present");
        assert!(Uuid::parse_str(correlation_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .header(USER_ID_HEADER, "user-1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        let response_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap();
        assert_eq!(response_id, request_uuid.to_string());
    }

    #[tokio::test]
    async fn test_correlation_id_reaches_handler() {
        async fn handler(CorrelationId(id): CorrelationId) -> String {
            id.to_string()
        }

        let app = Router::new()
            .route("/test", get(handler))
            .layer(correlation_id_layer());

        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(body, request_uuid.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_uuid_generates_new() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        let uuid_str = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap();
        assert!(Uuid::parse_str(uuid_str).is_ok());
        assert_ne!(uuid_str, "not-a-uuid");
    }
}
