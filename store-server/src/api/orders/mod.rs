//! Order API 模块

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    // 通用路由：登录用户即可 (handler 内部做属主检查)
    let general_routes = Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/stats", get(handler::stats))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel));

    // 管理路由：需要管理员角色
    let admin_routes = Router::new()
        .route("/{id}", put(handler::update))
        .layer(middleware::from_fn(require_admin));

    general_routes.merge(admin_routes)
}
