//! HTTP request handlers shared by every deployment of the engine.

pub mod health;

pub use health::{health_check, readiness_check};
