//! Error types for web handlers.
//!
//! [`AppError`] bridges the engine's [`TicketingError`] taxonomy and HTTP
//! responses, implementing Axum's `IntoResponse` trait.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use ticketing_core::error::{StoreError, TicketingError};

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Data>, AppError> {
///     let view = state.catalog.get_event(id).await?;
///     Ok(Json(view.into()))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Whether the client may retry the same request
    retryable: bool,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            retryable: false,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Mark the error as retryable.
    #[must_use]
    pub const fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether the client may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Create a 400 error for a request the caller got wrong.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "INVALID_INPUT".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error with a specific code.
    #[must_use]
    pub fn unprocessable(code: &str, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            code.to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a retryable 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
        .retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Whether the same request may succeed if retried.
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    retryable = self.retryable,
                    error = %source,
                    "Request failed"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    retryable = self.retryable,
                    "Request failed"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            retryable: self.retryable,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Map the engine's errors onto the HTTP status codes clients rely on.
impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        match &err {
            TicketingError::InvalidInput(message) => Self::bad_request(message.clone()),
            TicketingError::InvalidOutcome(_) => {
                tracing::warn!(error = %err, "Rejected payment outcome");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    err.to_string(),
                    "INVALID_OUTCOME".to_string(),
                )
            }
            TicketingError::Unauthenticated => Self::unauthorized(err.to_string()),
            TicketingError::EventNotFound(id) => Self::not_found("Event", id),
            TicketingError::ReservationNotFound(id) => Self::not_found("Reservation", id),
            TicketingError::InsufficientInventory { .. } => {
                Self::unprocessable("INSUFFICIENT_INVENTORY", err.to_string())
            }
            TicketingError::ReservationReclaimed(_) => {
                Self::unprocessable("RESERVATION_RECLAIMED", err.to_string())
            }
            TicketingError::Store(store) if store.is_transient() => {
                Self::unavailable("Storage temporarily unavailable, retry the request")
                    .with_source(anyhow::Error::new(store.clone()))
            }
            TicketingError::Store(store) => {
                let message = match store {
                    StoreError::Corrupt(_) => "Stored data is inconsistent",
                    _ => "An internal error occurred",
                };
                Self::internal(message).with_source(anyhow::Error::new(store.clone()))
            }
        }
    }
}

/// Malformed or mistyped request bodies are the caller's fault: 400.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::bad_request(rejection.body_text())
    }
}

/// Ids in the path that do not parse: 400 with the usual JSON body.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected path parameter");
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketing_core::types::{EventId, ReservationId};

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[INVALID_INPUT] Invalid input");
    }

    #[test]
    fn test_not_found() {
        let err = AppError::not_found("Event", "123");
        assert_eq!(err.to_string(), "[NOT_FOUND] Event with id 123 not found");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_business_outcomes_map_to_client_errors() {
        let cases = [
            (
                TicketingError::InvalidInput("count must be at least 1".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TicketingError::InvalidOutcome("3".into()),
                StatusCode::BAD_REQUEST,
            ),
            (TicketingError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                TicketingError::EventNotFound(EventId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                TicketingError::ReservationNotFound(ReservationId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                TicketingError::InsufficientInventory {
                    requested: 2,
                    available: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                TicketingError::ReservationReclaimed(ReservationId::new()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (error, status) in cases {
            let app_error = AppError::from(error);
            assert_eq!(app_error.status(), status);
            assert!(!app_error.is_retryable());
        }
    }

    #[test]
    fn test_transient_store_error_is_retryable_503() {
        let err = AppError::from(TicketingError::Store(StoreError::LockTimeout(
            "canceling statement due to lock timeout".into(),
        )));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_retryable());
        // Internal details stay out of the message.
        assert!(!err.to_string().contains("canceling"));
    }

    #[test]
    fn test_corrupt_data_is_500() {
        let err = AppError::from(TicketingError::Store(StoreError::Corrupt("bad".into())));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_insufficient_inventory_code() {
        let err = AppError::from(TicketingError::InsufficientInventory {
            requested: 3,
            available: 0,
        });
        assert_eq!(err.code(), "INSUFFICIENT_INVENTORY");
    }
}
