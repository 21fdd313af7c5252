//! 身份中间件
//!
//! 从网关身份头恢复 [`CurrentUser`] 并注入请求扩展

use axum::{extract::Request, middleware::Next, response::Response};

use crate::AppError;
use crate::auth::CurrentUser;
use crate::security_log;

/// 身份中间件 - 要求请求携带网关身份
///
/// 从 `x-user-id` / `x-user-role` 头解析身份，成功后将
/// [`CurrentUser`] 注入请求扩展 (`req.extensions_mut().insert(user)`)。
///
/// # 跳过身份检查的路径
///
/// - `OPTIONS *` (CORS 预检)
/// - 非 `/api/` 路径
/// - `/api/health` (健康检查)
///
/// # 错误处理
///
/// 缺少或畸形身份头返回 401 Unauthorized
pub async fn require_identity(mut req: Request, next: Next) -> Result<Response, AppError> {
    let path = req.uri().path();

    // 允许 CORS 预检的 OPTIONS 请求 (跳过身份检查)
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过身份检查 (让它们正常返回 404)
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    // 公共 API 路由跳过身份检查
    let is_public_api_route = path == "/api/health" || path.starts_with("/api/health/");
    if is_public_api_route {
        return Ok(next.run(req).await);
    }

    match CurrentUser::from_headers(req.headers()) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(reason) => {
            security_log!(
                "WARN",
                "identity_rejected",
                reason = reason,
                uri = format!("{:?}", req.uri())
            );
            Err(AppError::unauthorized())
        }
    }
}

/// 管理员中间件 - 要求管理员角色
///
/// 检查 `CurrentUser.role == ADMIN`
///
/// # 错误
///
/// 非管理员返回 403 Forbidden
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::unauthorized())?;
    if !user.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            user_id = user.id,
            user_role = user.role.as_str()
        );
        return Err(AppError::forbidden("Administrator role required"));
    }

    Ok(next.run(req).await)
}
