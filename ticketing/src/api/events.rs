//! Event endpoints.
//!
//! - POST /api/events - Create an event with its ticket set
//! - GET /api/events - List events, newest date first
//! - GET /api/events/:id - Event with its current available ticket count

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ticketing_core::error::TicketingError;
use ticketing_core::types::{Event, EventAvailability, EventId};
use ticketing_web::error::AppError;
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a new event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Display name
    pub name: String,
    /// When the event takes place. A bare `YYYY-MM-DD` means midnight UTC.
    #[serde(deserialize_with = "deserialize_event_date")]
    pub date: DateTime<Utc>,
    /// Number of tickets to provision
    pub capacity: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventDateInput {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

fn deserialize_event_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match EventDateInput::deserialize(deserializer)? {
        EventDateInput::Instant(at) => at,
        EventDateInput::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
    })
}

/// Response after creating an event.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventResponse {
    /// Created event ID
    pub id: Uuid,
}

/// Event as listed in the catalog.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    /// Event ID
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Declared capacity
    pub capacity: u32,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            name: event.name,
            date: event.date,
            capacity: event.capacity,
        }
    }
}

/// Event detail with point-in-time availability.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    /// Event ID
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Declared capacity
    pub capacity: u32,
    /// Tickets available or held by a lapsed reservation
    pub available_tickets_count: u32,
}

impl From<EventAvailability> for EventDetail {
    fn from(view: EventAvailability) -> Self {
        Self {
            id: *view.event.id.as_uuid(),
            name: view.event.name,
            date: view.event.date,
            capacity: view.event.capacity,
            available_tickets_count: view.available_count,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an event.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Spring Concert", "date": "2025-06-01T19:00:00Z", "capacity": 500}'
/// ```
pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let Json(request) = payload?;
    let capacity = u32::try_from(request.capacity).map_err(|_| {
        TicketingError::InvalidInput(format!("Invalid capacity {}", request.capacity))
    })?;

    let event = state
        .catalog()
        .create_event(&request.name, request.date, capacity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            id: *event.id.as_uuid(),
        }),
    ))
}

/// List all events.
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    let events = state.catalog().list_events().await?;
    Ok(Json(events.into_iter().map(EventSummary::from).collect()))
}

/// Get an event and its available ticket count.
///
/// The count is for display. It may be stale by the time a reservation is
/// attempted.
pub async fn get_event(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EventDetail>, AppError> {
    let Path(event_id) = path?;
    let view = state
        .catalog()
        .get_event(EventId::from_uuid(event_id))
        .await?;
    Ok(Json(view.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(date: &str) -> Result<CreateEventRequest, serde_json::Error> {
        serde_json::from_value(json!({ "name": "Gig", "date": date, "capacity": 10 }))
    }

    #[test]
    fn test_date_accepts_rfc3339() {
        let request = parse("2025-06-01T19:30:00+02:00").unwrap();
        assert_eq!(request.date.to_rfc3339(), "2025-06-01T17:30:00+00:00");
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        let request = parse("2025-06-01").unwrap();
        assert_eq!(request.date.to_rfc3339(), "2025-06-01T00:00:00+00:00");
    }

    #[test]
    fn test_garbage_date_is_rejected() {
        assert!(parse("June first").is_err());
        assert!(parse("2025-13-01").is_err());
    }
}
