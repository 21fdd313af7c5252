//! Order Validation
//!
//! Everything that must hold before a single write happens: request
//! shape, address ownership, product/variant resolution, and the stock
//! precheck. The stock number seen here is advisory; the authoritative
//! check is the conditional decrement at write time.

use crate::db::repository::{address, product};
use crate::utils::validation::{
    MAX_LINE_ITEMS, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_money, validate_optional_text,
    validate_quantity,
};
use crate::utils::{AppError, AppResult};
use shared::models::{
    OrderCreateRequest, OrderItemRequest, OrderUpdate, ProductVariant, ProductWithBrand,
};
use sqlx::SqlitePool;

/// One requested line resolved against the catalog, ready for pricing
/// and snapshotting.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub product: ProductWithBrand,
    pub variant: ProductVariant,
    pub quantity: i64,
}

/// Shape checks only; nothing here touches the database.
pub fn validate_request(req: &OrderCreateRequest) -> AppResult<()> {
    if req.items.is_empty() {
        return Err(AppError::validation("Order must contain at least one item"));
    }
    if req.items.len() > MAX_LINE_ITEMS {
        return Err(AppError::validation(format!(
            "Order cannot exceed {MAX_LINE_ITEMS} line items"
        )));
    }
    for item in &req.items {
        validate_quantity(item.quantity)?;
        validate_optional_text(item.color.as_deref(), "color", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(item.size.as_deref(), "size", MAX_SHORT_TEXT_LEN)?;
    }
    if let Some(shipping_cost) = req.shipping_cost {
        validate_money(shipping_cost, "shipping_cost")?;
    }
    if let Some(discount) = req.discount_amount {
        validate_money(discount, "discount_amount")?;
    }
    validate_optional_text(req.payment_method.as_deref(), "payment_method", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(req.notes.as_deref(), "notes", MAX_NOTE_LEN)?;
    Ok(())
}

/// Shape checks for the admin patch payload.
pub fn validate_update(data: &OrderUpdate) -> AppResult<()> {
    validate_optional_text(data.status_note.as_deref(), "status_note", MAX_NOTE_LEN)?;
    validate_optional_text(
        data.payment_method.as_deref(),
        "payment_method",
        MAX_SHORT_TEXT_LEN,
    )?;
    validate_optional_text(
        data.payment_transaction_id.as_deref(),
        "payment_transaction_id",
        MAX_SHORT_TEXT_LEN,
    )?;
    validate_optional_text(
        data.tracking_number.as_deref(),
        "tracking_number",
        MAX_SHORT_TEXT_LEN,
    )?;
    validate_optional_text(data.notes.as_deref(), "notes", MAX_NOTE_LEN)?;
    Ok(())
}

/// Check shipping + billing address existence and ownership.
/// Returns the effective (shipping, billing) pair; billing falls back
/// to shipping when not supplied.
pub async fn validate_addresses(
    pool: &SqlitePool,
    user_id: i64,
    shipping_address_id: i64,
    billing_address_id: Option<i64>,
) -> AppResult<(i64, i64)> {
    check_address(pool, user_id, shipping_address_id, "Shipping").await?;
    let billing_id = match billing_address_id {
        Some(id) if id != shipping_address_id => {
            check_address(pool, user_id, id, "Billing").await?;
            id
        }
        Some(id) => id,
        None => shipping_address_id,
    };
    Ok((shipping_address_id, billing_id))
}

async fn check_address(pool: &SqlitePool, user_id: i64, id: i64, which: &str) -> AppResult<()> {
    let addr = address::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{which} address {id} not found")))?;
    // Ownerless addresses are shared (guest checkout); owned ones must
    // belong to the requester
    if let Some(owner) = addr.user_id
        && owner != user_id
    {
        return Err(AppError::forbidden(format!(
            "{which} address does not belong to you"
        )));
    }
    Ok(())
}

/// Resolve every requested line against the live catalog.
pub async fn resolve_items(
    pool: &SqlitePool,
    items: &[OrderItemRequest],
) -> AppResult<Vec<ResolvedLine>> {
    let mut resolved = Vec::with_capacity(items.len());
    for item in items {
        let line = resolve_item(pool, item).await?;
        resolved.push(line);
    }
    Ok(resolved)
}

async fn resolve_item(pool: &SqlitePool, item: &OrderItemRequest) -> AppResult<ResolvedLine> {
    let product = product::find_with_brand(pool, item.product_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", item.product_id)))?;
    if !product.is_active {
        return Err(AppError::invalid(format!(
            "Product {} is not available",
            product.name
        )));
    }

    let variants = product::find_variants(pool, item.product_id).await?;
    let variant = match_variant(&variants, item.color.as_deref(), item.size.as_deref())
        .ok_or_else(|| {
            AppError::invalid(format!(
                "No variant of {} matches {}",
                product.name,
                describe_wanted(item)
            ))
        })?
        .clone();

    if variant.stock < item.quantity {
        return Err(AppError::insufficient_stock(
            &product.name,
            item.quantity,
            variant.stock,
        ));
    }

    Ok(ResolvedLine {
        product,
        variant,
        quantity: item.quantity,
    })
}

/// Variant matching rules:
/// - color + size → exact match on both
/// - color only → first variant of that color (any size)
/// - no color → only unambiguous for single-variant products
fn match_variant<'a>(
    variants: &'a [ProductVariant],
    color: Option<&str>,
    size: Option<&str>,
) -> Option<&'a ProductVariant> {
    match color {
        Some(color) => variants
            .iter()
            .find(|v| v.color == color && (size.is_none() || v.size.as_deref() == size)),
        None => match variants {
            [only] if size.is_none() || only.size.as_deref() == size => Some(only),
            _ => None,
        },
    }
}

fn describe_wanted(item: &OrderItemRequest) -> String {
    match (&item.color, &item.size) {
        (Some(color), Some(size)) => format!("{color}/{size}"),
        (Some(color), None) => color.clone(),
        (None, Some(size)) => format!("size {size}"),
        (None, None) => "the default variant".into(),
    }
}
