//! Mapping from sqlx errors to the engine's `StoreError`.

use ticketing_core::error::StoreError;

/// `lock_not_available`: raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `query_canceled`: raised when `statement_timeout` expires.
const QUERY_CANCELED: &str = "57014";
/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";

/// Classify a sqlx error as transient or permanent.
///
/// Connection-level failures become `Unavailable`, lock and statement timeouts
/// become `LockTimeout`, aborted transactions become `Conflict`. Everything else
/// is a plain `Database` error.
#[must_use]
pub fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(error.to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(LOCK_NOT_AVAILABLE | QUERY_CANCELED) => {
                metrics::counter!("ticketing_store_lock_timeouts_total").increment(1);
                tracing::warn!(error = %error, "Gave up waiting for ticket row locks");
                StoreError::LockTimeout(error.to_string())
            }
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                StoreError::Conflict(error.to_string())
            }
            _ => StoreError::Database(error.to_string()),
        },
        _ => StoreError::Database(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        let error = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, StoreError::Unavailable(_)));
        assert!(error.is_transient());
    }

    #[test]
    fn row_not_found_is_permanent() {
        let error = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(error, StoreError::Database(_)));
        assert!(!error.is_transient());
    }
}
