//! `PostgreSQL` ticket store for the reservation engine.
//!
//! This crate provides a PostgreSQL-based implementation of the `TicketStore`
//! and `TicketTransaction` traits from `ticketing-core`. It uses sqlx runtime
//! queries and relies on:
//!
//! - `SELECT ... FOR UPDATE` (optionally `SKIP LOCKED`) to serialize buyers
//!   competing for the same tickets
//! - READ COMMITTED re-checks after a lock wait, so a ticket taken by the
//!   winner drops out of the loser's candidate set
//! - A per-transaction `lock_timeout` to turn pathological waits into a
//!   retryable `StoreError::LockTimeout`
//! - Embedded migrations (`migrations/`)
//!
//! # Example
//!
//! ```ignore
//! use ticketing_postgres::PostgresTicketStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresTicketStore::new("postgres://localhost/ticketing").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod ticket_store;

pub use error::map_sqlx_error;
pub use ticket_store::PostgresTicketStore;
