//! HTTP API handlers.
//!
//! Thin adapters: parse the request, call one service, map the result.
//! Status codes come from `AppError`'s mapping of `TicketingError`.

pub mod events;
pub mod payments;
pub mod reservations;
