//! Product Repository
//!
//! Catalog reads plus stock mutation. Stock never goes through
//! read-check-write: the decrement carries its `stock >= ?` guard
//! inside the UPDATE itself, so two concurrent orders can never both
//! take the last unit.

use super::RepoResult;
use shared::models::{ProductVariant, ProductWithBrand};
use sqlx::SqlitePool;

const PRODUCT_SELECT: &str = "SELECT p.id, p.brand_id, b.name AS brand_name, p.name, p.description, p.price, p.image, p.is_active, p.created_at, p.updated_at FROM product p JOIN brand b ON b.id = p.brand_id";

const VARIANT_SELECT: &str =
    "SELECT id, product_id, color, size, stock, images, updated_at FROM product_variant";

pub async fn find_with_brand(pool: &SqlitePool, id: i64) -> RepoResult<Option<ProductWithBrand>> {
    let row = sqlx::query_as::<_, ProductWithBrand>(&format!("{PRODUCT_SELECT} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_variants(pool: &SqlitePool, product_id: i64) -> RepoResult<Vec<ProductVariant>> {
    let rows = sqlx::query_as::<_, ProductVariant>(&format!(
        "{VARIANT_SELECT} WHERE product_id = ? ORDER BY id"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn current_stock(pool: &SqlitePool, variant_id: i64) -> RepoResult<Option<i64>> {
    let stock = sqlx::query_scalar::<_, i64>("SELECT stock FROM product_variant WHERE id = ?")
        .bind(variant_id)
        .fetch_optional(pool)
        .await?;
    Ok(stock)
}

// ── Stock mutation ───────────────────────────────────────────

/// Conditionally take `quantity` units off a variant.
///
/// The `stock >= ?` guard and the subtraction happen in one statement;
/// returns false (and changes nothing) when stock is insufficient.
/// 并发下单时只有一个请求能拿到最后一件。
pub async fn decrement_stock(
    executor: impl sqlx::SqliteExecutor<'_>,
    variant_id: i64,
    quantity: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE product_variant SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1",
    )
    .bind(quantity)
    .bind(now)
    .bind(variant_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Put `quantity` units back on a variant (order cancelled).
///
/// Addressed by the order item's frozen variant key rather than a
/// variant id, because order items survive variant deletion.
/// Unconditional: restore must not fail on stock level. Returns false
/// when no variant matches the key anymore.
pub async fn restore_stock_by_key(
    executor: impl sqlx::SqliteExecutor<'_>,
    product_id: i64,
    color: &str,
    size: Option<&str>,
    quantity: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE product_variant SET stock = stock + ?1, updated_at = ?2 WHERE product_id = ?3 AND color = ?4 AND COALESCE(size, '') = COALESCE(?5, '')",
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .bind(color)
    .bind(size)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}
