//! Ticket reservation and finalization service.
//!
//! Allocates a finite, numbered pool of tickets per event to competing buyers
//! without ever overselling, lets unpaid holds lapse without a sweeper, and
//! applies payment outcomes exactly once.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum, ticketing-web)
//!        │
//!        ▼
//! ┌──────────────┐  ┌──────────────────────┐  ┌──────────────┐
//! │ EventCatalog │  │ ReservationCoordinator│  │  Finalizer   │
//! └──────────────┘  └──────────────────────┘  └──────────────┘
//!        │                    │                      │
//!        └────────────────────┼──────────────────────┘
//!                             ▼
//!              TicketStore / TicketTransaction
//!         (PostgresTicketStore | InMemoryTicketStore)
//! ```
//!
//! # Ticket lifecycle
//!
//! ```text
//! Available ──reserve──▶ Held ──finalize(Approved)──▶ Sold
//!     ▲                   │
//!     └──── hold lapses ──┘   (lazy: the next reserve reclaims it)
//! ```
//!
//! A held ticket whose reservation expired is simply eligible again the next
//! time the coordinator selects candidates. Nothing runs at expiry.

#![forbid(unsafe_code)]

pub mod api;
pub mod app;
pub mod config;
pub mod metrics;
pub mod server;

pub use app::{EventCatalog, Finalizer, ReservationCoordinator, ReservationPolicy, TicketingServices};
pub use config::Config;
pub use server::{AppState, build_router};
