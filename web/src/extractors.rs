//! Custom Axum extractors.
//!
//! - `CorrelationId`: Extract or generate request correlation IDs
//! - `AuthenticatedUser`: The buyer identity forwarded by the upstream
//!   authentication layer in the `X-User-Id` header
//!
//! # Examples
//!
//! ```ignore
//! use ticketing_web::extractors::{AuthenticatedUser, CorrelationId};
//!
//! async fn handler(
//!     user: AuthenticatedUser,
//!     correlation_id: CorrelationId,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(
//!         correlation_id = %correlation_id.0,
//!         user_id = %user.0,
//!         "Processing request"
//!     );
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use ticketing_core::types::UserId;
use uuid::Uuid;

/// Header carrying the authenticated buyer's identifier.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Correlation ID for request tracing.
///
/// Uses the ID stored by the correlation-id middleware when installed,
/// otherwise reads the `X-Correlation-ID` header or generates a new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Identity of the buyer making the request.
///
/// Authentication itself happens upstream; this extractor only insists the
/// identity is present. A missing, non-UTF-8 or blank `X-User-Id` is rejected
/// with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        UserId::parse(raw).map(Self).map_err(|err| {
            tracing::warn!(header = USER_ID_HEADER, "Request without user identity");
            AppError::from(err)
        })
    }
}
