//! Status Transition Rules
//!
//! 订单状态机的唯一真源. Every status change, whether from the update
//! endpoint or the cancel endpoint, is checked against this table
//! before any write happens.
//!
//! ```text
//! pending ──► confirmed ──► processing ──► shipped ──► delivered
//!    │            │              │            │            │
//!    │            │              │            └──► returned ◄┘
//!    └────────────┴──────────────┴──► cancelled
//! ```

use shared::models::OrderStatus;

/// Targets reachable from `from`, in lifecycle order.
/// CANCELLED and RETURNED are terminal.
pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[Processing, Cancelled],
        Processing => &[Shipped, Cancelled],
        Shipped => &[Delivered, Returned],
        Delivered => &[Returned],
        Cancelled | Returned => &[],
    }
}

pub fn is_legal(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// The explicit cancel entry point is narrower than the table: stock
/// restoration only makes sense before fulfilment starts.
pub fn is_cancellable(from: OrderStatus) -> bool {
    matches!(from, OrderStatus::Pending | OrderStatus::Confirmed)
}
