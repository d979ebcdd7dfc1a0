//! Axum integration for the ticket reservation engine.
//!
//! The services in the `ticketing` crate speak [`TicketingError`]; this crate
//! turns that into HTTP:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         HTTP boundary (Axum)            │  ← JSON, X-User-Id, correlation IDs
//! │  - Identity extraction                  │  ← 401 before any service call
//! │  - Error → status mapping               │  ← 400/404/422/503
//! ├─────────────────────────────────────────┤
//! │         Engine services                 │
//! │  - Catalog, Coordinator, Finalizer      │  ← One transaction per mutation
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ticketing_web::{AppError, AuthenticatedUser};
//! use axum::{extract::{Path, State}, Json};
//!
//! async fn reserve(
//!     State(state): State<AppState>,
//!     AuthenticatedUser(user): AuthenticatedUser,
//!     Path(event_id): Path<Uuid>,
//!     Json(request): Json<ReserveRequest>,
//! ) -> Result<Json<ReservationReceipt>, AppError> {
//!     let receipt = state.coordinator.reserve(event_id, user, request.count).await?;
//!     Ok(Json(receipt))
//! }
//! ```
//!
//! [`TicketingError`]: ticketing_core::TicketingError

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{AuthenticatedUser, CorrelationId, USER_ID_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
