//! Order Repository
//!
//! Aggregate writes (create, transition, cancel) run as single SQLite
//! transactions whose first statement touches the orders table, so the
//! transaction takes the write lock up front and conflicting writers
//! queue on busy_timeout instead of failing mid-way.

use super::{RepoError, RepoResult, product};
use shared::models::{
    Order, OrderDetail, OrderItem, OrderStatus, OrderStatusHistory, OrderUpdate, PaymentStatus,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const ORDER_SELECT: &str = "SELECT id, order_number, user_id, subtotal, shipping_cost, tax_amount, discount_amount, total_amount, total_items, status, payment_status, payment_method, payment_transaction_id, shipping_address_id, billing_address_id, notes, tracking_number, estimated_delivery, delivered_at, created_at, updated_at FROM orders";

const ITEM_SELECT: &str = "SELECT id, order_id, product_id, product_name, brand_name, color, size, image, unit_price, quantity, line_total FROM order_item";

const HISTORY_SELECT: &str =
    "SELECT id, order_id, status, note, created_at FROM order_status_history";

// ── Write models ─────────────────────────────────────────────

/// Fully resolved order ready to persist. The service computes pricing
/// and resolves variants before this ever reaches the repository.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: i64,
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total_amount: f64,
    pub shipping_address_id: i64,
    pub billing_address_id: i64,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

/// Catalog snapshot for one line, plus the resolved variant row id used
/// for the stock decrement.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub variant_id: i64,
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

/// Outcome of the atomic order write.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Order),
    /// The write-time stock re-check failed for `items[item_index]`.
    /// Nothing was persisted.
    OutOfStock { item_index: usize },
}

// ── Create ───────────────────────────────────────────────────

/// Persist header + items + per-line stock decrements + initial history
/// as one transaction.
///
/// Stock was already checked during validation, but a racing order may
/// have consumed it since; the conditional decrement re-checks at write
/// time and a failed line rolls the whole order back, so no partial
/// decrement ever survives. An order_number collision surfaces as
/// `RepoError::Duplicate` from the header insert.
pub async fn create(pool: &SqlitePool, data: &NewOrder) -> RepoResult<CreateOutcome> {
    let now = now_millis();
    let order_id = snowflake_id();
    let total_items: i64 = data.items.iter().map(|i| i.quantity).sum();

    let mut tx = pool.begin().await?;

    // 订单头先写: 立刻拿到写锁, 后续 decrement 不会因锁升级失败
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, subtotal, shipping_cost, tax_amount, discount_amount, total_amount, total_items, status, payment_status, payment_method, shipping_address_id, billing_address_id, notes, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'PENDING', 'PENDING', ?10, ?11, ?12, ?13, ?14, ?14)",
    )
    .bind(order_id)
    .bind(&data.order_number)
    .bind(data.user_id)
    .bind(data.subtotal)
    .bind(data.shipping_cost)
    .bind(data.tax_amount)
    .bind(data.discount_amount)
    .bind(data.total_amount)
    .bind(total_items)
    .bind(&data.payment_method)
    .bind(data.shipping_address_id)
    .bind(data.billing_address_id)
    .bind(&data.notes)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (item_index, item) in data.items.iter().enumerate() {
        let decremented =
            product::decrement_stock(&mut *tx, item.variant_id, item.quantity, now).await?;
        if !decremented {
            // Dropping the tx rolls back the header and earlier lines
            return Ok(CreateOutcome::OutOfStock { item_index });
        }

        sqlx::query(
            "INSERT INTO order_item (id, order_id, product_id, product_name, brand_name, color, size, image, unit_price, quantity, line_total) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(snowflake_id())
        .bind(order_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(&item.brand_name)
        .bind(&item.color)
        .bind(&item.size)
        .bind(&item.image)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.line_total)
        .execute(&mut *tx)
        .await?;
    }

    insert_history(&mut tx, order_id, OrderStatus::Pending, None, now).await?;
    tx.commit().await?;

    let order = find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))?;
    Ok(CreateOutcome::Created(order))
}

// ── Reads ────────────────────────────────────────────────────

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let row = sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let rows = sqlx::query_as::<_, OrderItem>(&format!("{ITEM_SELECT} WHERE order_id = ? ORDER BY id"))
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_history(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderStatusHistory>> {
    let rows = sqlx::query_as::<_, OrderStatusHistory>(&format!(
        "{HISTORY_SELECT} WHERE order_id = ? ORDER BY created_at, id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_detail(pool: &SqlitePool, id: i64) -> RepoResult<Option<OrderDetail>> {
    let Some(order) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let items = find_items(pool, id).await?;
    let timeline = find_history(pool, id).await?;
    Ok(Some(OrderDetail {
        order,
        items,
        timeline,
    }))
}

// ── Listing ──────────────────────────────────────────────────

/// Sortable columns (whitelist; raw sort strings never reach SQL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    #[default]
    CreatedAt,
    TotalAmount,
}

#[derive(Debug, Clone)]
pub struct OrderListFilter {
    /// Scope to one user's orders (always set for non-admin callers)
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Substring match on order_number
    pub number_like: Option<String>,
    pub from_millis: Option<i64>,
    /// Exclusive upper bound
    pub to_millis: Option<i64>,
    pub sort: OrderSort,
    pub ascending: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for OrderListFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            status: None,
            payment_status: None,
            number_like: None,
            from_millis: None,
            to_millis: None,
            sort: OrderSort::CreatedAt,
            ascending: false,
            limit: 50,
            offset: 0,
        }
    }
}

pub async fn list(pool: &SqlitePool, filter: &OrderListFilter) -> RepoResult<Vec<Order>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(ORDER_SELECT);
    qb.push(" WHERE 1=1");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(payment_status) = filter.payment_status {
        qb.push(" AND payment_status = ").push_bind(payment_status);
    }
    if let Some(q) = &filter.number_like {
        qb.push(" AND order_number LIKE ").push_bind(format!("%{q}%"));
    }
    if let Some(from) = filter.from_millis {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to_millis {
        qb.push(" AND created_at < ").push_bind(to);
    }
    qb.push(match filter.sort {
        OrderSort::CreatedAt => " ORDER BY created_at",
        OrderSort::TotalAmount => " ORDER BY total_amount",
    });
    qb.push(if filter.ascending { " ASC" } else { " DESC" });
    qb.push(" LIMIT ").push_bind(filter.limit);
    qb.push(" OFFSET ").push_bind(filter.offset);

    let rows = qb.build_query_as::<Order>().fetch_all(pool).await?;
    Ok(rows)
}

// ── Status changes ───────────────────────────────────────────

/// Apply `from -> to` with a compare-and-set on the observed status.
///
/// Legality is the transition engine's job; this only guarantees the
/// write lands against the same status the caller checked. Returns
/// false when a concurrent transition got there first.
pub async fn transition_status(
    pool: &SqlitePool,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
    note: Option<&str>,
) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let sql = if to == OrderStatus::Delivered {
        // First arrival into DELIVERED stamps delivered_at; later
        // transitions keep the original timestamp
        "UPDATE orders SET status = ?1, delivered_at = COALESCE(delivered_at, ?2), updated_at = ?2 WHERE id = ?3 AND status = ?4"
    } else {
        "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4"
    };
    let rows = sqlx::query(sql)
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(&mut *tx)
        .await?;
    if rows.rows_affected() == 0 {
        return Ok(false);
    }

    insert_history(&mut tx, id, to, note, now).await?;
    tx.commit().await?;
    Ok(true)
}

/// Cancel with stock restoration, one transaction.
///
/// CAS against the observed status, then every item's frozen quantity
/// goes back to its variant (matched by key, since the variant row may
/// have been edited or deleted since the order was placed). Payment is
/// settled as REFUNDED.
pub async fn cancel(
    pool: &SqlitePool,
    id: i64,
    observed: OrderStatus,
    reason: Option<&str>,
) -> RepoResult<bool> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE orders SET status = 'CANCELLED', payment_status = 'REFUNDED', updated_at = ?1 WHERE id = ?2 AND status = ?3",
    )
    .bind(now)
    .bind(id)
    .bind(observed)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Ok(false);
    }

    let items = sqlx::query_as::<_, OrderItem>(&format!("{ITEM_SELECT} WHERE order_id = ? ORDER BY id"))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
    for item in &items {
        let restored = product::restore_stock_by_key(
            &mut *tx,
            item.product_id,
            &item.color,
            item.size.as_deref(),
            item.quantity,
            now,
        )
        .await?;
        if !restored {
            tracing::warn!(
                order_id = id,
                product_id = item.product_id,
                color = %item.color,
                "Variant no longer exists, stock not restored"
            );
        }
    }

    insert_history(&mut tx, id, OrderStatus::Cancelled, reason, now).await?;
    tx.commit().await?;
    Ok(true)
}

/// Partial header update (admin). Status is deliberately absent here;
/// status changes only ever go through `transition_status` / `cancel`.
pub async fn update_fields(pool: &SqlitePool, id: i64, data: &OrderUpdate) -> RepoResult<Order> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = COALESCE(?1, payment_status), payment_method = COALESCE(?2, payment_method), payment_transaction_id = COALESCE(?3, payment_transaction_id), tracking_number = COALESCE(?4, tracking_number), estimated_delivery = COALESCE(?5, estimated_delivery), notes = COALESCE(?6, notes), updated_at = ?7 WHERE id = ?8",
    )
    .bind(data.payment_status)
    .bind(&data.payment_method)
    .bind(&data.payment_transaction_id)
    .bind(&data.tracking_number)
    .bind(data.estimated_delivery)
    .bind(&data.notes)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))
}

// ── Stats ────────────────────────────────────────────────────

pub async fn count_by_status(
    pool: &SqlitePool,
    user_id: Option<i64>,
) -> RepoResult<Vec<(OrderStatus, i64)>> {
    let rows = match user_id {
        Some(uid) => {
            sqlx::query_as::<_, (OrderStatus, i64)>(
                "SELECT status, COUNT(*) FROM orders WHERE user_id = ? GROUP BY status",
            )
            .bind(uid)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, (OrderStatus, i64)>(
                "SELECT status, COUNT(*) FROM orders GROUP BY status",
            )
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Sum of total_amount over DELIVERED orders. With `brand_owner_id`,
/// only orders containing at least one item from that owner's brands
/// are counted.
pub async fn delivered_revenue(
    pool: &SqlitePool,
    brand_owner_id: Option<i64>,
) -> RepoResult<f64> {
    let sum: Option<f64> = match brand_owner_id {
        Some(owner_id) => {
            sqlx::query_scalar(
                "SELECT SUM(o.total_amount) FROM orders o WHERE o.status = 'DELIVERED' AND EXISTS (SELECT 1 FROM order_item oi JOIN product p ON p.id = oi.product_id JOIN brand b ON b.id = p.brand_id WHERE oi.order_id = o.id AND b.owner_id = ?)",
            )
            .bind(owner_id)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar("SELECT SUM(total_amount) FROM orders WHERE status = 'DELIVERED'")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(sum.unwrap_or(0.0))
}

// ── Internal helpers ─────────────────────────────────────────

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    order_id: i64,
    status: OrderStatus,
    note: Option<&str>,
    now: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_status_history (id, order_id, status, note, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(snowflake_id())
    .bind(order_id)
    .bind(status)
    .bind(note)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
