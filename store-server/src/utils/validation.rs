//! Input validation helpers
//!
//! Centralized limits and validation functions for order payloads.
//! SQLite TEXT has no built-in length enforcement, so lengths are
//! checked here before anything reaches the repository layer.

use crate::utils::AppError;

// ── Limits ──────────────────────────────────────────────────────────

/// Notes, cancel reasons, status notes
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: payment method tags, tracking numbers, colors, sizes
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Line items per order
pub const MAX_LINE_ITEMS: usize = 100;

/// Quantity per line item
pub const MAX_QUANTITY: i64 = 999;

/// Upper bound for caller-supplied money amounts (shipping, discount)
pub const MAX_MONEY: f64 = 1_000_000.0;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: Option<&str>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Validate a caller-supplied money amount (finite, non-negative, bounded).
pub fn validate_money(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!("{field} must be a number")));
    }
    if value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must not be negative"
        )));
    }
    if value > MAX_MONEY {
        return Err(AppError::validation(format!(
            "{field} exceeds the allowed maximum"
        )));
    }
    Ok(())
}

/// Validate a line-item quantity (1..=MAX_QUANTITY).
pub fn validate_quantity(quantity: i64) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds the allowed maximum ({MAX_QUANTITY})"
        )));
    }
    Ok(())
}
