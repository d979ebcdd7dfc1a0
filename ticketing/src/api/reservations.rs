//! Reservation endpoints.
//!
//! - POST /api/events/:id/reservations - Hold tickets (requires `X-User-Id`)
//! - GET /api/reservations/:id - Reservation with its derived state

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketing_core::error::TicketingError;
use ticketing_core::types::{EventId, ReservationId, ReservationReceipt, ReservationState, ReservationView};
use ticketing_web::{AuthenticatedUser, error::AppError};
use uuid::Uuid;

/// Request to hold tickets.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    /// Number of tickets
    pub count: i64,
}

/// Response after holding tickets.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveResponse {
    /// New reservation ID
    pub reservation_id: Uuid,
    /// Event reserved
    pub event_id: Uuid,
    /// Tickets held
    pub ticket_count: u32,
    /// When the hold lapses
    pub expires_at: DateTime<Utc>,
}

impl From<ReservationReceipt> for ReserveResponse {
    fn from(receipt: ReservationReceipt) -> Self {
        Self {
            reservation_id: *receipt.reservation_id.as_uuid(),
            event_id: *receipt.event_id.as_uuid(),
            ticket_count: receipt.ticket_count,
            expires_at: receipt.expires_at,
        }
    }
}

/// Reservation details.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    /// Reservation ID
    pub id: Uuid,
    /// Event reserved
    pub event_id: Uuid,
    /// Buyer
    pub user_id: String,
    /// Tickets bound at creation
    pub ticket_count: u32,
    /// When the hold was taken
    pub created_at: DateTime<Utc>,
    /// When the hold lapses
    pub expires_at: DateTime<Utc>,
    /// Derived state
    pub state: ReservationState,
    /// Numbers of the tickets still bound to the reservation
    pub ticket_numbers: Vec<u32>,
}

impl From<ReservationView> for ReservationResponse {
    fn from(view: ReservationView) -> Self {
        let reservation = view.reservation;
        Self {
            id: *reservation.id.as_uuid(),
            event_id: *reservation.event_id.as_uuid(),
            user_id: reservation.user_id.as_str().to_string(),
            ticket_count: reservation.ticket_count,
            created_at: reservation.created_at,
            expires_at: reservation.expires_at,
            state: view.state,
            ticket_numbers: view.ticket_numbers,
        }
    }
}

/// Hold `count` tickets for the calling user.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<event_id>/reservations \
///   -H "X-User-Id: user-42" \
///   -H "Content-Type: application/json" \
///   -d '{"count": 2}'
/// ```
pub async fn reserve(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReserveRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReserveResponse>), AppError> {
    let Path(event_id) = path?;
    let Json(request) = payload?;
    let count = u32::try_from(request.count).map_err(|_| {
        TicketingError::InvalidInput(format!("Invalid ticket count {}", request.count))
    })?;

    let receipt = state
        .coordinator()
        .reserve(EventId::from_uuid(event_id), user.as_str(), count)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// Look up a reservation.
pub async fn get_reservation(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ReservationResponse>, AppError> {
    let Path(reservation_id) = path?;
    let view = state
        .catalog()
        .get_reservation(ReservationId::from_uuid(reservation_id))
        .await?;
    Ok(Json(view.into()))
}
