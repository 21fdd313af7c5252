//! Order Service
//!
//! Orchestration for the whole order lifecycle: create, read, list,
//! update, cancel, stats. Handlers stay thin; every business decision
//! lives here or in the modules this one calls.
//!
//! 并发模型: 库存走条件扣减, 状态变更走 CAS + 有限重试. 本层不持有
//! 任何内存锁, 同一订单的并发请求由数据库行状态裁决.

use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::order::{
    self as order_repo, CreateOutcome, NewOrder, NewOrderItem, OrderListFilter, OrderSort,
};
use crate::db::repository::{RepoError, product};
use crate::orders::{pricing, transition, validator};
use crate::utils::time::{day_end_millis, day_start_millis, parse_date};
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::utils::{AppError, AppResult};
use shared::models::{
    Order, OrderCreateRequest, OrderDetail, OrderListQuery, OrderStats, OrderStatus, OrderUpdate,
};

/// Bounded retries for order-number collisions and transition CAS races
const MAX_RETRIES: u32 = 3;

// ── Create ───────────────────────────────────────────────────

/// Validate, price, and atomically persist a new order.
///
/// The requester becomes the order owner. A number collision (unique
/// index hit) regenerates and retries; a write-time stock miss surfaces
/// as `InsufficientStock` with the stock that is actually left.
pub async fn create_order(
    state: &ServerState,
    user: &CurrentUser,
    req: &OrderCreateRequest,
) -> AppResult<OrderDetail> {
    validator::validate_request(req)?;
    let (shipping_address_id, billing_address_id) = validator::validate_addresses(
        &state.pool,
        user.id,
        req.shipping_address_id,
        req.billing_address_id,
    )
    .await?;
    let resolved = validator::resolve_items(&state.pool, &req.items).await?;

    let shipping_cost = req.shipping_cost.unwrap_or(0.0);
    let discount_amount = req.discount_amount.unwrap_or(0.0);
    let pairs: Vec<(f64, i64)> = resolved
        .iter()
        .map(|line| (line.product.price, line.quantity))
        .collect();
    let breakdown = pricing::price_order(&pairs, shipping_cost, discount_amount);
    if breakdown.total_amount < 0.0 {
        return Err(AppError::validation("Discount exceeds the order total"));
    }

    let items: Vec<NewOrderItem> = resolved
        .iter()
        .zip(&breakdown.lines)
        .map(|(line, amount)| NewOrderItem {
            variant_id: line.variant.id,
            product_id: line.product.id,
            product_name: line.product.name.clone(),
            brand_name: line.product.brand_name.clone(),
            color: line.variant.color.clone(),
            size: line.variant.size.clone(),
            image: line
                .variant
                .images
                .first()
                .cloned()
                .or_else(|| line.product.image.clone()),
            unit_price: amount.unit_price,
            quantity: amount.quantity,
            line_total: amount.line_total,
        })
        .collect();

    let mut data = NewOrder {
        order_number: String::new(),
        user_id: user.id,
        subtotal: breakdown.subtotal,
        shipping_cost: breakdown.shipping_cost,
        tax_amount: breakdown.tax_amount,
        discount_amount: breakdown.discount_amount,
        total_amount: breakdown.total_amount,
        shipping_address_id,
        billing_address_id,
        payment_method: req.payment_method.clone(),
        notes: req.notes.clone(),
        items,
    };

    for attempt in 0..MAX_RETRIES {
        data.order_number = state.order_numbers.next();
        match order_repo::create(&state.pool, &data).await {
            Ok(CreateOutcome::Created(order)) => {
                audit_log!(
                    "order_created",
                    "order",
                    order.id,
                    user_id = user.id,
                    order_number = %order.order_number,
                    total_amount = order.total_amount
                );
                return load_detail(state, order.id).await;
            }
            Ok(CreateOutcome::OutOfStock { item_index }) => {
                let line = &resolved[item_index];
                let available = product::current_stock(&state.pool, line.variant.id)
                    .await?
                    .unwrap_or(0);
                return Err(AppError::insufficient_stock(
                    &line.product.name,
                    line.quantity,
                    available,
                ));
            }
            Err(RepoError::Duplicate(_)) => {
                tracing::warn!(
                    order_number = %data.order_number,
                    attempt = attempt + 1,
                    "Order number collision, regenerating"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::conflict("Could not allocate a unique order number"))
}

// ── Reads ────────────────────────────────────────────────────

pub async fn get_order(state: &ServerState, user: &CurrentUser, id: i64) -> AppResult<OrderDetail> {
    let detail = load_detail(state, id).await?;
    ensure_can_view(user, &detail.order)?;
    Ok(detail)
}

pub async fn list_orders(
    state: &ServerState,
    user: &CurrentUser,
    query: &OrderListQuery,
) -> AppResult<Vec<Order>> {
    let filter = build_filter(state, user, query)?;
    Ok(order_repo::list(&state.pool, &filter).await?)
}

fn build_filter(
    state: &ServerState,
    user: &CurrentUser,
    query: &OrderListQuery,
) -> AppResult<OrderListFilter> {
    let mut filter = OrderListFilter {
        // Non-admins only ever see their own orders
        user_id: if user.is_admin() {
            query.user_id
        } else {
            Some(user.id)
        },
        status: query.status,
        payment_status: query.payment_status,
        number_like: query.q.clone(),
        ..Default::default()
    };

    let tz = state.config.timezone;
    if let Some(date) = &query.date_from {
        filter.from_millis = Some(day_start_millis(parse_date(date)?, tz));
    }
    if let Some(date) = &query.date_to {
        // Inclusive date, exclusive millis bound
        filter.to_millis = Some(day_end_millis(parse_date(date)?, tz));
    }

    filter.sort = match query.sort.as_deref() {
        None | Some("created_at") => OrderSort::CreatedAt,
        Some("total_amount") => OrderSort::TotalAmount,
        Some(other) => {
            return Err(AppError::validation(format!(
                "Unsupported sort field: {other}"
            )));
        }
    };
    filter.ascending = match query.order.as_deref() {
        None | Some("desc") => false,
        Some("asc") => true,
        Some(other) => {
            return Err(AppError::validation(format!(
                "Unsupported sort order: {other}"
            )));
        }
    };
    filter.limit = query.limit.unwrap_or(50).clamp(1, 200);
    filter.offset = query.offset.unwrap_or(0).max(0);
    Ok(filter)
}

// ── Update ───────────────────────────────────────────────────

/// Admin patch. A `status` field goes through the transition table and
/// appends history; other fields patch the header directly. Note that
/// setting status to CANCELLED here is a bare transition: stock
/// restoration and the refund only happen through `cancel_order`.
pub async fn update_order(
    state: &ServerState,
    user: &CurrentUser,
    id: i64,
    data: &OrderUpdate,
) -> AppResult<OrderDetail> {
    validator::validate_update(data)?;
    let order = order_repo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;

    if let Some(target) = data.status {
        let from = apply_transition(state, &order, target, data.status_note.as_deref()).await?;
        audit_log!(
            "order_status_changed",
            "order",
            id,
            user_id = user.id,
            from = from.as_str(),
            to = target.as_str()
        );
    }

    let has_field_patch = data.payment_status.is_some()
        || data.payment_method.is_some()
        || data.payment_transaction_id.is_some()
        || data.tracking_number.is_some()
        || data.estimated_delivery.is_some()
        || data.notes.is_some();
    if has_field_patch {
        order_repo::update_fields(&state.pool, id, data).await?;
    }

    load_detail(state, id).await
}

/// Check legality and apply with CAS. A lost race reloads the order and
/// re-checks against the fresh status, so legality and the write always
/// agree on what they observed.
async fn apply_transition(
    state: &ServerState,
    order: &Order,
    target: OrderStatus,
    note: Option<&str>,
) -> AppResult<OrderStatus> {
    let mut observed = order.status;
    for _ in 0..MAX_RETRIES {
        if !transition::is_legal(observed, target) {
            return Err(AppError::invalid_transition(observed, target));
        }
        if order_repo::transition_status(&state.pool, order.id, observed, target, note).await? {
            return Ok(observed);
        }
        observed = reload_status(state, order.id).await?;
    }
    Err(AppError::busy(
        "Order is being modified concurrently, please retry",
    ))
}

// ── Cancel ───────────────────────────────────────────────────

/// Explicit cancel: owner or admin, only before fulfilment starts.
/// Restores every item's stock and settles payment as refunded.
pub async fn cancel_order(
    state: &ServerState,
    user: &CurrentUser,
    id: i64,
    reason: Option<&str>,
) -> AppResult<OrderDetail> {
    validate_optional_text(reason, "reason", MAX_NOTE_LEN)?;
    let order = order_repo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    ensure_can_view(user, &order)?;

    let mut observed = order.status;
    for _ in 0..MAX_RETRIES {
        if !transition::is_cancellable(observed) {
            return Err(AppError::invalid_operation(format!(
                "Cannot cancel an order in {observed} status"
            )));
        }
        if order_repo::cancel(&state.pool, id, observed, reason).await? {
            audit_log!(
                "order_cancelled",
                "order",
                id,
                user_id = user.id,
                from = observed.as_str()
            );
            return load_detail(state, id).await;
        }
        observed = reload_status(state, id).await?;
    }
    Err(AppError::busy(
        "Order is being modified concurrently, please retry",
    ))
}

// ── Stats ────────────────────────────────────────────────────

/// Aggregate counts + delivered revenue.
///
/// Admins see the whole store, or one user when `scope_user_id` is
/// given. Other users are always scoped to themselves regardless of the
/// parameter: their own order counts, and revenue restricted to
/// delivered orders containing items from brands they own (zero for
/// plain customers).
pub async fn order_stats(
    state: &ServerState,
    user: &CurrentUser,
    scope_user_id: Option<i64>,
) -> AppResult<OrderStats> {
    let scope = if user.is_admin() {
        scope_user_id
    } else {
        Some(user.id)
    };
    let counts = order_repo::count_by_status(&state.pool, scope).await?;
    let delivered_revenue = order_repo::delivered_revenue(&state.pool, scope).await?;

    let mut stats = OrderStats {
        delivered_revenue,
        ..Default::default()
    };
    for (status, count) in counts {
        stats.total_orders += count;
        match status {
            OrderStatus::Pending => stats.pending = count,
            OrderStatus::Confirmed => stats.confirmed = count,
            OrderStatus::Processing => stats.processing = count,
            OrderStatus::Shipped => stats.shipped = count,
            OrderStatus::Delivered => stats.delivered = count,
            OrderStatus::Cancelled => stats.cancelled = count,
            OrderStatus::Returned => stats.returned = count,
        }
    }
    Ok(stats)
}

// ── Internal helpers ─────────────────────────────────────────

fn ensure_can_view(user: &CurrentUser, order: &Order) -> AppResult<()> {
    if !user.is_admin() && order.user_id != user.id {
        return Err(AppError::forbidden("You do not have access to this order"));
    }
    Ok(())
}

async fn load_detail(state: &ServerState, id: i64) -> AppResult<OrderDetail> {
    order_repo::find_detail(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))
}

async fn reload_status(state: &ServerState, id: i64) -> AppResult<OrderStatus> {
    Ok(order_repo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?
        .status)
}
