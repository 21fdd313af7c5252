//! Order Pricing
//!
//! Pure money math for order creation. Uses rust_decimal internally,
//! stores as f64 rounded to 2 decimal places.
//!
//! `total = subtotal + shipping - discount + tax`, where
//! `tax = subtotal * 8%`. Flat rate, no jurisdiction logic. Every
//! component is rounded to cents before the total is formed, so the
//! stored amounts always sum exactly to the stored total.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Flat tax rate: 8% of the item subtotal
fn tax_rate() -> Decimal {
    Decimal::new(8, 2)
}

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Round to 2 decimal places, half away from zero
#[inline]
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an already-rounded Decimal back to f64 for storage
#[inline]
fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// One priced line: `line_total = unit_price * quantity`, rounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAmount {
    pub unit_price: f64,
    pub quantity: i64,
    pub line_total: f64,
}

/// Monetary breakdown of one order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingBreakdown {
    pub lines: Vec<LineAmount>,
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    /// Exact sum of the rounded components. May come out negative when
    /// the discount exceeds everything else; the caller rejects that.
    pub total_amount: f64,
}

/// Price an order from `(unit_price, quantity)` pairs.
///
/// Negative prices/quantities are a caller bug, not user input:
/// validation happens before pricing.
pub fn price_order(
    lines: &[(f64, i64)],
    shipping_cost: f64,
    discount_amount: f64,
) -> PricingBreakdown {
    debug_assert!(
        lines.iter().all(|&(p, q)| p >= 0.0 && q >= 0),
        "negative unit_price or quantity reached pricing"
    );
    debug_assert!(
        shipping_cost >= 0.0 && discount_amount >= 0.0,
        "negative shipping_cost or discount_amount reached pricing"
    );

    // Each line rounds to cents on its own; the subtotal is the sum of
    // the stored line totals, not of the raw products
    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;
    for &(unit_price, quantity) in lines {
        let line_total = round2(to_decimal(unit_price) * Decimal::from(quantity));
        subtotal += line_total;
        priced.push(LineAmount {
            unit_price,
            quantity,
            line_total: to_f64(line_total),
        });
    }

    // Total is derived from the rounded components, never from unrounded
    // intermediates: the persisted columns must reconcile exactly
    let shipping = round2(to_decimal(shipping_cost));
    let discount = round2(to_decimal(discount_amount));
    let tax = round2(subtotal * tax_rate());
    let total = subtotal + shipping - discount + tax;

    PricingBreakdown {
        lines: priced,
        subtotal: to_f64(subtotal),
        shipping_cost: to_f64(shipping),
        tax_amount: to_f64(tax),
        discount_amount: to_f64(discount),
        total_amount: to_f64(total),
    }
}
