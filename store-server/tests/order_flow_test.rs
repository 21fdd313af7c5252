//! 订单全流程集成测试
//!
//! 使用 ServerState::initialize 完整初始化 (真实 SQLite 文件 + 迁移)，
//! 直接调用 service 层，覆盖下单、定价、取消、状态机、越权和统计。

use shared::models::{
    OrderCreateRequest, OrderItemRequest, OrderStatus, OrderUpdate, PaymentStatus, UserRole,
};
use store_server::auth::CurrentUser;
use store_server::db::repository::product;
use store_server::orders::service;
use store_server::{AppError, Config, ServerState};
use tempfile::TempDir;

async fn setup() -> (ServerState, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let mut config = Config::with_overrides(dir.path().to_str().unwrap(), 0);
    config.timezone = chrono_tz::UTC;
    let state = ServerState::initialize(&config).await.expect("state");
    seed_catalog(&state).await;
    (state, dir)
}

/// 基础目录数据:
/// - 地址 1 属于用户 10, 地址 2 属于用户 20, 地址 3 无归属 (自提点)
/// - 品牌 Acme 属于用户 50
/// - 商品 1 'Classic Tee' $25.00: Black/M 库存 10, Black/L 库存 2
/// - 商品 2 'Mug' $9.50: 单变体 White 无尺码, 库存 5
/// - 商品 3 'Retired' 已下架
async fn seed_catalog(state: &ServerState) {
    let pool = &state.pool;
    for sql in [
        "INSERT INTO address (id, user_id, full_name, phone, line1, city, postal_code, country) VALUES (1, 10, 'Alice', '555-0100', '1 Main St', 'Springfield', '62701', 'US')",
        "INSERT INTO address (id, user_id, full_name, phone, line1, city, postal_code, country) VALUES (2, 20, 'Bob', '555-0200', '9 Elm St', 'Shelbyville', '62565', 'US')",
        "INSERT INTO address (id, user_id, full_name, phone, line1, city, postal_code, country) VALUES (3, NULL, 'Pickup Point', '555-0000', '5 Depot Rd', 'Springfield', '62701', 'US')",
        "INSERT INTO brand (id, name, owner_id) VALUES (1, 'Acme', 50)",
        "INSERT INTO product (id, brand_id, name, price) VALUES (1, 1, 'Classic Tee', 25.0)",
        "INSERT INTO product (id, brand_id, name, price) VALUES (2, 1, 'Mug', 9.5)",
        "INSERT INTO product (id, brand_id, name, price, is_active) VALUES (3, 1, 'Retired', 1.0, 0)",
        "INSERT INTO product_variant (id, product_id, color, size, stock) VALUES (1, 1, 'Black', 'M', 10)",
        "INSERT INTO product_variant (id, product_id, color, size, stock) VALUES (2, 1, 'Black', 'L', 2)",
        "INSERT INTO product_variant (id, product_id, color, size, stock) VALUES (3, 2, 'White', NULL, 5)",
    ] {
        sqlx::query(sql).execute(pool).await.expect("seed");
    }
}

fn customer(id: i64) -> CurrentUser {
    CurrentUser {
        id,
        role: UserRole::Customer,
    }
}

fn admin(id: i64) -> CurrentUser {
    CurrentUser {
        id,
        role: UserRole::Admin,
    }
}

fn item(product_id: i64, quantity: i64, color: Option<&str>, size: Option<&str>) -> OrderItemRequest {
    OrderItemRequest {
        product_id,
        quantity,
        color: color.map(Into::into),
        size: size.map(Into::into),
    }
}

fn request(items: Vec<OrderItemRequest>, shipping_address_id: i64) -> OrderCreateRequest {
    OrderCreateRequest {
        items,
        shipping_address_id,
        billing_address_id: None,
        shipping_cost: None,
        discount_amount: None,
        payment_method: None,
        notes: None,
    }
}

async fn stock(state: &ServerState, variant_id: i64) -> i64 {
    product::current_stock(&state.pool, variant_id)
        .await
        .unwrap()
        .unwrap()
}

/// 管理员推进状态 (走状态机)
async fn advance(state: &ServerState, order_id: i64, to: OrderStatus) {
    let update = OrderUpdate {
        status: Some(to),
        ..Default::default()
    };
    service::update_order(state, &admin(1), order_id, &update)
        .await
        .expect("transition");
}

#[tokio::test]
async fn test_create_order_pricing_and_snapshot() {
    let (state, _dir) = setup().await;

    // 3 × $25.00 + 运费 $5.00 - 折扣 $2.00, 税 8% 只对小计
    let req = OrderCreateRequest {
        shipping_cost: Some(5.0),
        discount_amount: Some(2.0),
        payment_method: Some("card".into()),
        ..request(vec![item(1, 3, Some("Black"), Some("M"))], 1)
    };
    let detail = service::create_order(&state, &customer(10), &req)
        .await
        .unwrap();

    let order = &detail.order;
    assert_eq!(order.user_id, 10);
    assert_eq!(order.subtotal, 75.0);
    assert_eq!(order.shipping_cost, 5.0);
    assert_eq!(order.tax_amount, 6.0);
    assert_eq!(order.discount_amount, 2.0);
    assert_eq!(order.total_amount, 84.0);
    assert_eq!(order.total_items, 3);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert!(order.order_number.starts_with("ORD"));
    // billing 缺省回落到 shipping
    assert_eq!(order.billing_address_id, order.shipping_address_id);

    // 行项目是下单时刻的目录快照
    assert_eq!(detail.items.len(), 1);
    let line = &detail.items[0];
    assert_eq!(line.product_name, "Classic Tee");
    assert_eq!(line.brand_name, "Acme");
    assert_eq!(line.color, "Black");
    assert_eq!(line.size.as_deref(), Some("M"));
    assert_eq!(line.unit_price, 25.0);
    assert_eq!(line.quantity, 3);
    assert_eq!(line.line_total, 75.0);

    // 时间线只有创建一条
    assert_eq!(detail.timeline.len(), 1);
    assert_eq!(detail.timeline[0].status, OrderStatus::Pending);

    // 库存已扣
    assert_eq!(stock(&state, 1).await, 7);
}

#[tokio::test]
async fn test_snapshot_survives_catalog_edits() {
    let (state, _dir) = setup().await;

    let detail = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();

    // 改价 + 改名后历史订单不受影响
    sqlx::query("UPDATE product SET name = 'Renamed', price = 99.0 WHERE id = 1")
        .execute(&state.pool)
        .await
        .unwrap();

    let reloaded = service::get_order(&state, &customer(10), detail.order.id)
        .await
        .unwrap();
    assert_eq!(reloaded.items[0].product_name, "Classic Tee");
    assert_eq!(reloaded.items[0].unit_price, 25.0);
    assert_eq!(reloaded.order.subtotal, 25.0);
}

#[tokio::test]
async fn test_insufficient_stock_precheck() {
    let (state, _dir) = setup().await;

    // Black/L 只有 2 件
    let err = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 5, Some("Black"), Some("L"))], 1),
    )
    .await
    .unwrap_err();

    match err {
        AppError::InsufficientStock {
            product,
            requested,
            available,
        } => {
            assert_eq!(product, "Classic Tee");
            assert_eq!(requested, 5);
            assert_eq!(available, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    // 预检失败不产生任何写入
    assert_eq!(stock(&state, 2).await, 2);
}

#[tokio::test]
async fn test_address_ownership_no_admin_bypass() {
    let (state, _dir) = setup().await;

    // 用户 10 使用用户 20 的地址
    let err = service::create_order(&state, &customer(10), &request(vec![item(2, 1, None, None)], 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // 管理员也不能替别人下单到别人的地址: 下单人就是订单属主
    let err = service::create_order(&state, &admin(1), &request(vec![item(2, 1, None, None)], 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // 无归属地址谁都能用
    let detail = service::create_order(&state, &customer(10), &request(vec![item(2, 1, None, None)], 3))
        .await
        .unwrap();
    assert_eq!(detail.order.shipping_address_id, 3);
}

#[tokio::test]
async fn test_variant_resolution_rules() {
    let (state, _dir) = setup().await;

    // 不存在的颜色
    let err = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Green"), None)], 1),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Invalid(_)));

    // 单变体商品可省略颜色
    let detail = service::create_order(&state, &customer(10), &request(vec![item(2, 2, None, None)], 1))
        .await
        .unwrap();
    assert_eq!(detail.items[0].color, "White");
    assert_eq!(detail.items[0].size, None);
    assert_eq!(stock(&state, 3).await, 3);

    // 下架商品
    let err = service::create_order(&state, &customer(10), &request(vec![item(3, 1, None, None)], 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Invalid(_)));
}

#[tokio::test]
async fn test_discount_exceeding_total_rejected() {
    let (state, _dir) = setup().await;

    let req = OrderCreateRequest {
        discount_amount: Some(50.0),
        ..request(vec![item(2, 1, None, None)], 1)
    };
    let err = service::create_order(&state, &customer(10), &req)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    // 拒绝发生在写入之前
    assert_eq!(stock(&state, 3).await, 5);
}

#[tokio::test]
async fn test_cancel_restores_stock_and_refunds() {
    let (state, _dir) = setup().await;

    let detail = service::create_order(
        &state,
        &customer(10),
        &request(
            vec![item(1, 2, Some("Black"), Some("M")), item(2, 1, None, None)],
            1,
        ),
    )
    .await
    .unwrap();
    assert_eq!(stock(&state, 1).await, 8);
    assert_eq!(stock(&state, 3).await, 4);

    let cancelled = service::cancel_order(&state, &customer(10), detail.order.id, Some("changed my mind"))
        .await
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.order.payment_status, PaymentStatus::Refunded);

    // 每一行的库存都回来了
    assert_eq!(stock(&state, 1).await, 10);
    assert_eq!(stock(&state, 3).await, 5);

    // 取消原因进入时间线
    let last = cancelled.timeline.last().unwrap();
    assert_eq!(last.status, OrderStatus::Cancelled);
    assert_eq!(last.note.as_deref(), Some("changed my mind"));
}

#[tokio::test]
async fn test_cancel_after_fulfilment_rejected() {
    let (state, _dir) = setup().await;

    let detail = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();
    let id = detail.order.id;

    advance(&state, id, OrderStatus::Confirmed).await;
    advance(&state, id, OrderStatus::Processing).await;
    advance(&state, id, OrderStatus::Shipped).await;

    let err = service::cancel_order(&state, &customer(10), id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOperation(_)));

    // 订单原样, 库存不回补
    let reloaded = service::get_order(&state, &customer(10), id).await.unwrap();
    assert_eq!(reloaded.order.status, OrderStatus::Shipped);
    assert_eq!(stock(&state, 1).await, 9);
}

#[tokio::test]
async fn test_full_lifecycle_stamps_delivered_at_once() {
    let (state, _dir) = setup().await;

    let detail = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();
    let id = detail.order.id;
    assert_eq!(detail.order.delivered_at, None);

    advance(&state, id, OrderStatus::Confirmed).await;
    advance(&state, id, OrderStatus::Processing).await;
    advance(&state, id, OrderStatus::Shipped).await;
    advance(&state, id, OrderStatus::Delivered).await;

    let delivered = service::get_order(&state, &customer(10), id).await.unwrap();
    assert_eq!(delivered.order.status, OrderStatus::Delivered);
    let stamp = delivered.order.delivered_at.expect("delivered_at stamped");
    assert!(stamp > 0);
    // 创建 + 4 次变更
    assert_eq!(delivered.timeline.len(), 5);

    // 退货不会冲掉首次送达时间
    advance(&state, id, OrderStatus::Returned).await;
    let returned = service::get_order(&state, &customer(10), id).await.unwrap();
    assert_eq!(returned.order.status, OrderStatus::Returned);
    assert_eq!(returned.order.delivered_at, Some(stamp));
    assert_eq!(returned.timeline.len(), 6);
}

#[tokio::test]
async fn test_illegal_transition_rejected() {
    let (state, _dir) = setup().await;

    let detail = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();

    // PENDING 不能直接发货
    let update = OrderUpdate {
        status: Some(OrderStatus::Shipped),
        ..Default::default()
    };
    let err = service::update_order(&state, &admin(1), detail.order.id, &update)
        .await
        .unwrap_err();
    match err {
        AppError::InvalidTransition { from, to } => {
            assert_eq!(from, OrderStatus::Pending);
            assert_eq!(to, OrderStatus::Shipped);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_patches_fields_and_notes_history() {
    let (state, _dir) = setup().await;

    let detail = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();
    let id = detail.order.id;

    let update = OrderUpdate {
        status: Some(OrderStatus::Confirmed),
        status_note: Some("payment received".into()),
        payment_status: Some(PaymentStatus::Paid),
        tracking_number: Some("TRK-001".into()),
        ..Default::default()
    };
    let updated = service::update_order(&state, &admin(1), id, &update)
        .await
        .unwrap();

    assert_eq!(updated.order.status, OrderStatus::Confirmed);
    assert_eq!(updated.order.payment_status, PaymentStatus::Paid);
    assert_eq!(updated.order.tracking_number.as_deref(), Some("TRK-001"));
    // 未提及的字段不动
    assert_eq!(updated.order.total_amount, detail.order.total_amount);

    let last = updated.timeline.last().unwrap();
    assert_eq!(last.status, OrderStatus::Confirmed);
    assert_eq!(last.note.as_deref(), Some("payment received"));

    // 不存在的订单
    let err = service::update_order(&state, &admin(1), 999_999, &OrderUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_get_order_scoping() {
    let (state, _dir) = setup().await;

    let detail = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();
    let id = detail.order.id;

    // 属主和管理员可见, 其他用户 Forbidden
    assert!(service::get_order(&state, &customer(10), id).await.is_ok());
    assert!(service::get_order(&state, &admin(1), id).await.is_ok());
    let err = service::get_order(&state, &customer(20), id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_list_scoping_and_filters() {
    let (state, _dir) = setup().await;

    let a = service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();
    let _b = service::create_order(&state, &customer(10), &request(vec![item(2, 1, None, None)], 3))
        .await
        .unwrap();
    let c = service::create_order(&state, &customer(20), &request(vec![item(2, 1, None, None)], 2))
        .await
        .unwrap();
    advance(&state, c.order.id, OrderStatus::Confirmed).await;

    // 普通用户只看到自己的, user_id 参数被忽略
    let query = shared::models::OrderListQuery {
        user_id: Some(20),
        ..Default::default()
    };
    let mine = service::list_orders(&state, &customer(10), &query).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|o| o.user_id == 10));

    // 管理员全局 + 按用户过滤
    let all = service::list_orders(&state, &admin(1), &Default::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    let theirs = service::list_orders(&state, &admin(1), &query).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].user_id, 20);

    // 状态过滤
    let confirmed = service::list_orders(
        &state,
        &admin(1),
        &shared::models::OrderListQuery {
            status: Some(OrderStatus::Confirmed),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, c.order.id);

    // 订单号子串搜索
    let hits = service::list_orders(
        &state,
        &customer(10),
        &shared::models::OrderListQuery {
            q: Some(a.order.order_number.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, a.order.id);

    // 日期范围 (UTC): 全包含与空区间
    let wide = shared::models::OrderListQuery {
        date_from: Some("2020-01-01".into()),
        date_to: Some("2099-12-31".into()),
        ..Default::default()
    };
    assert_eq!(service::list_orders(&state, &admin(1), &wide).await.unwrap().len(), 3);
    let future = shared::models::OrderListQuery {
        date_from: Some("2099-01-01".into()),
        date_to: Some("2099-12-31".into()),
        ..Default::default()
    };
    assert!(service::list_orders(&state, &admin(1), &future).await.unwrap().is_empty());

    // 非法排序字段
    let err = service::list_orders(
        &state,
        &admin(1),
        &shared::models::OrderListQuery {
            sort: Some("color".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_stats_scoping() {
    let (state, _dir) = setup().await;

    // 用户 10: 一单送达 (Mug $9.50 → 税后 $10.26), 一单挂起
    let delivered = service::create_order(&state, &customer(10), &request(vec![item(2, 1, None, None)], 1))
        .await
        .unwrap();
    let id = delivered.order.id;
    advance(&state, id, OrderStatus::Confirmed).await;
    advance(&state, id, OrderStatus::Processing).await;
    advance(&state, id, OrderStatus::Shipped).await;
    advance(&state, id, OrderStatus::Delivered).await;

    service::create_order(
        &state,
        &customer(10),
        &request(vec![item(1, 1, Some("Black"), Some("M"))], 1),
    )
    .await
    .unwrap();
    // 用户 20: 一单挂起
    service::create_order(&state, &customer(20), &request(vec![item(2, 1, None, None)], 2))
        .await
        .unwrap();

    let total = delivered.order.total_amount;

    // 管理员: 全店
    let stats = service::order_stats(&state, &admin(1), None).await.unwrap();
    assert_eq!(stats.total_orders, 3);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.delivered_revenue, total);

    // 管理员按用户过滤: 用户 20 只有一单挂起, 不拥有品牌
    let stats = service::order_stats(&state, &admin(1), Some(20)).await.unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.delivered_revenue, 0.0);

    // 管理员按用户 50 过滤: 没有订单, 品牌营收跟着 scope 走
    let stats = service::order_stats(&state, &admin(1), Some(50)).await.unwrap();
    assert_eq!(stats.total_orders, 0);
    assert_eq!(stats.delivered_revenue, total);

    // 买家 10: 自己的单量, 但不拥有品牌 → 营收为 0
    let stats = service::order_stats(&state, &customer(10), None).await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.delivered_revenue, 0.0);

    // 买家带 user_id 参数不生效, 仍然只看到自己
    let stats = service::order_stats(&state, &customer(10), Some(20)).await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.delivered, 1);

    // 品牌主 50: 没有自己的订单, 但送达营收归他的品牌
    let stats = service::order_stats(&state, &customer(50), None).await.unwrap();
    assert_eq!(stats.total_orders, 0);
    assert_eq!(stats.delivered_revenue, total);
}
