//! Product Model
//!
//! Catalog CRUD is owned by the catalog service; the order core reads
//! products/variants for validation + snapshotting and mutates only
//! `product_variant.stock` (through the inventory repository).

use serde::{Deserialize, Serialize};

/// Product joined with its brand name, as snapshotted onto order items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductWithBrand {
    pub id: i64,
    pub brand_id: i64,
    pub brand_name: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Product variant entity (规格: 颜色/尺码 + 库存)
///
/// `(product_id, color, size)` is unique; `stock` is guarded by a
/// `CHECK (stock >= 0)` constraint and only mutated via the inventory
/// repository's conditional update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub color: String,
    pub size: Option<String>,
    pub stock: i64,
    /// Image URLs, stored as a JSON array column
    #[cfg_attr(feature = "db", sqlx(json))]
    pub images: Vec<String>,
    pub updated_at: i64,
}
