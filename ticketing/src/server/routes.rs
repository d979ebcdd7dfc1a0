//! Router configuration for the ticketing service.

use super::state::AppState;
use crate::api::{events, payments, reservations};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use ticketing_web::correlation_id_layer;
use ticketing_web::handlers::health::{Readiness, health_check, readiness_check};

/// Build the complete Axum router.
///
/// - `GET /health`, `GET /ready`
/// - `POST /api/events`, `GET /api/events`, `GET /api/events/:id`
/// - `POST /api/events/:id/reservations`
/// - `GET /api/reservations/:id`
/// - `POST /api/events/payment_webhook`
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/events", post(events::create_event).get(events::list_events))
        // Static segment wins over `:id`.
        .route("/events/payment_webhook", post(payments::payment_webhook))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/reservations", post(reservations::reserve))
        .route("/reservations/:id", get(reservations::get_reservation));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    readiness_check(state.store.as_ref()).await
}
