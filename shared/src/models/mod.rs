//! Data models
//!
//! Shared between store-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all timestamps are
//! Unix millis, all money values are f64 rounded to 2 decimal places.

pub mod address;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use address::*;
pub use order::*;
pub use product::*;
pub use user::*;
