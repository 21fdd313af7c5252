//! Order Models
//!
//! Order aggregate = header + frozen line items + append-only status
//! history. Items snapshot the catalog at order time (name, price,
//! brand, variant, image) so later catalog edits never rewrite
//! historical orders.

use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// Legal transitions are enforced by the transition engine; rows only
/// ever move along that table, `CANCELLED` and `RETURNED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// All states, in lifecycle order
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Returned => "RETURNED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status (opaque to the core; the gateway reconciles it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity (订单头)
///
/// Invariants: `total_amount == subtotal + shipping_cost + tax_amount
/// - discount_amount` (2dp), `total_items == Σ item.quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Human-facing unique number (ORD...), never reused
    pub order_number: String,
    pub user_id: i64,
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
    pub total_items: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub shipping_address_id: i64,
    pub billing_address_id: i64,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<i64>,
    /// Stamped on the first transition into DELIVERED
    pub delivered_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line item (下单时刻的目录快照, 创建后不可变)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    /// Source product, for traceability only
    pub product_id: i64,
    pub product_name: String,
    pub brand_name: String,
    pub color: String,
    pub size: Option<String>,
    pub image: Option<String>,
    pub unit_price: f64,
    pub quantity: i64,
    pub line_total: f64,
}

/// Status history entry (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderStatusHistory {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Order with items + status timeline (detail view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub timeline: Vec<OrderStatusHistory>,
}

/// Requested line item for order creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i64,
    /// Variant color; may be omitted for single-variant products
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreateRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address_id: i64,
    /// Defaults to the shipping address
    pub billing_address_id: Option<i64>,
    pub shipping_cost: Option<f64>,
    pub discount_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Update order payload (admin; partial)
///
/// A `status` field is routed through the transition engine, everything
/// else patches the header directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    /// Note recorded on the history entry when `status` is set
    pub status_note: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<i64>,
    pub notes: Option<String>,
}

/// Cancel order payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

/// List query parameters (all optional)
///
/// Dates are `YYYY-MM-DD` interpreted in the server timezone;
/// `date_to` is inclusive (the whole day is covered).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Substring match on order_number
    pub q: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Admin only: scope to one user's orders
    pub user_id: Option<i64>,
    /// `created_at` (default) or `total_amount`
    pub sort: Option<String>,
    /// `desc` (default) or `asc`
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Stats query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderStatsQuery {
    /// Admin only: scope counts and revenue to one user
    pub user_id: Option<i64>,
}

/// Aggregate counts + recognized revenue (stats endpoint)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub processing: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub cancelled: i64,
    pub returned: i64,
    /// Sum of total_amount over DELIVERED orders
    pub delivered_revenue: f64,
}
