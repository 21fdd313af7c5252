//! Address Model
//!
//! Address book entries are managed by the account service; the order
//! core only reads them for ownership checks and snapshot references.

use serde::{Deserialize, Serialize};

/// Address entity (收货/账单地址)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Address {
    pub id: i64,
    /// Owning user; NULL for shared/guest addresses
    pub user_id: Option<i64>,
    pub full_name: String,
    pub phone: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub created_at: i64,
    pub updated_at: i64,
}
