//! Payment webhook.
//!
//! - POST /api/events/payment_webhook - Apply a payment outcome to a reservation
//!
//! The payment provider reports `paymentStatus` as `1` (approved) or `2`
//! (declined); the strings `"approved"` and `"declined"` are accepted too.
//! Anything else is refused with 400 before the store is touched.
//!
//! The payment client only understands 400 and 422 from this endpoint, so an
//! unknown reservation is reported as 422 `RESERVATION_NOT_FOUND` rather than
//! 404.

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;
use ticketing_core::error::TicketingError;
use ticketing_core::types::{Finalization, PaymentOutcome, ReservationId};
use ticketing_web::{CorrelationId, error::AppError};
use uuid::Uuid;

/// Webhook body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookRequest {
    /// Reservation being paid for
    #[serde(alias = "reservation_id")]
    pub reservation_id: Uuid,
    /// Outcome as reported by the provider
    #[serde(alias = "payment_status")]
    pub payment_status: Value,
}

/// Decode the provider's status field.
///
/// # Errors
///
/// Returns [`TicketingError::InvalidOutcome`] for anything other than the two
/// known codes or labels.
pub fn parse_payment_status(status: &Value) -> Result<PaymentOutcome, TicketingError> {
    match status {
        Value::Number(n) => n.as_i64().map_or_else(
            || Err(TicketingError::InvalidOutcome(n.to_string())),
            PaymentOutcome::from_code,
        ),
        Value::String(s) => s.parse(),
        other => Err(TicketingError::InvalidOutcome(other.to_string())),
    }
}

/// Map a finalization failure onto the webhook's status codes.
#[must_use]
pub fn webhook_error(error: TicketingError) -> AppError {
    match error {
        TicketingError::ReservationNotFound(_) => {
            AppError::unprocessable("RESERVATION_NOT_FOUND", error.to_string())
        }
        other => AppError::from(other),
    }
}

/// Apply a payment outcome.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/payment_webhook \
///   -H "Content-Type: application/json" \
///   -d '{"reservationId": "<reservation_id>", "paymentStatus": 1}'
/// ```
pub async fn payment_webhook(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    payload: Result<Json<PaymentWebhookRequest>, JsonRejection>,
) -> Result<Json<Finalization>, AppError> {
    let Json(request) = payload?;
    let outcome = parse_payment_status(&request.payment_status)?;

    tracing::debug!(
        correlation_id = %correlation_id,
        reservation_id = %request.reservation_id,
        outcome = %outcome,
        "Payment webhook received"
    );

    let finalization = state
        .finalizer()
        .finalize(ReservationId::from_uuid(request.reservation_id), outcome)
        .await
        .map_err(webhook_error)?;

    Ok(Json(finalization))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_codes() {
        assert_eq!(parse_payment_status(&json!(1)), Ok(PaymentOutcome::Approved));
        assert_eq!(parse_payment_status(&json!(2)), Ok(PaymentOutcome::Declined));
    }

    #[test]
    fn test_labels_case_insensitive() {
        assert_eq!(
            parse_payment_status(&json!("APPROVED")),
            Ok(PaymentOutcome::Approved)
        );
        assert_eq!(
            parse_payment_status(&json!("declined")),
            Ok(PaymentOutcome::Declined)
        );
    }

    #[test]
    fn test_unknown_reservation_is_422() {
        let error = webhook_error(TicketingError::ReservationNotFound(ReservationId::new()));
        assert_eq!(error.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error.code(), "RESERVATION_NOT_FOUND");
    }

    #[test]
    fn test_other_failures_keep_their_mapping() {
        let error = webhook_error(TicketingError::ReservationReclaimed(ReservationId::new()));
        assert_eq!(error.code(), "RESERVATION_RECLAIMED");

        let error = webhook_error(TicketingError::InvalidOutcome("3".into()));
        assert_eq!(error.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_everything_else_is_invalid() {
        for value in [json!(0), json!(3), json!(1.5), json!("paid"), json!(null), json!(true)] {
            assert!(matches!(
                parse_payment_status(&value),
                Err(TicketingError::InvalidOutcome(_))
            ));
        }
    }
}
