//! Order API Handlers
//!
//! Handler 只做参数提取和响应包装，业务逻辑在 [`crate::orders::service`]。

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::service;
use crate::utils::{AppResponse, AppResult, ok_with_message};
use shared::models::{
    CancelOrderRequest, Order, OrderCreateRequest, OrderDetail, OrderListQuery, OrderStats,
    OrderStatsQuery, OrderUpdate,
};

/// POST /api/orders - 创建订单
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<OrderCreateRequest>,
) -> AppResult<Json<OrderDetail>> {
    let detail = service::create_order(&state, &current_user, &payload).await?;
    Ok(Json(detail))
}

/// GET /api/orders - 订单列表（普通用户只能看到自己的）
pub async fn list(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = service::list_orders(&state, &current_user, &query).await?;
    Ok(Json(orders))
}

/// GET /api/orders/stats - 订单统计（管理员全局或按用户，普通用户仅自己）
pub async fn stats(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<OrderStatsQuery>,
) -> AppResult<Json<OrderStats>> {
    let stats = service::order_stats(&state, &current_user, query.user_id).await?;
    Ok(Json(stats))
}

/// GET /api/orders/:id - 获取订单详情（含明细和状态时间线）
pub async fn get_by_id(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = service::get_order(&state, &current_user, id).await?;
    Ok(Json(detail))
}

/// PUT /api/orders/:id - 更新订单（管理员；status 走状态机）
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderUpdate>,
) -> AppResult<Json<OrderDetail>> {
    let detail = service::update_order(&state, &current_user, id, &payload).await?;
    Ok(Json(detail))
}

/// POST /api/orders/:id/cancel - 取消订单（恢复库存并标记退款）
///
/// 请求体可省略；带 `reason` 时记入状态历史。
pub async fn cancel(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    payload: Option<Json<CancelOrderRequest>>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    let reason = payload.as_ref().and_then(|p| p.reason.as_deref());
    let detail = service::cancel_order(&state, &current_user, id, reason).await?;
    Ok(ok_with_message(detail, "Order cancelled"))
}
