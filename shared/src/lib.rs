//! Shared types for the storefront backend
//!
//! Domain models and ID/time helpers used across server crates.
//! DB row types are feature-gated behind `db` so API clients can
//! consume the models without pulling in sqlx.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
