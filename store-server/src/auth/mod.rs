//! 身份模块 - 网关注入的用户身份
//!
//! 认证在上游网关完成；本服务只信任网关安装的身份头：
//!
//! | Header | 说明 |
//! |--------|------|
//! | `x-user-id` | 用户 ID (i64, 必需) |
//! | `x-user-role` | `ADMIN` \| `CUSTOMER` (缺省 CUSTOMER) |
//!
//! [`middleware::require_identity`] 将 [`CurrentUser`] 注入请求扩展，
//! handler 通过 `Extension(current_user)` 或 extractor 获取。

pub mod extractor;
pub mod middleware;

pub use middleware::{require_admin, require_identity};

use http::HeaderMap;
use shared::models::UserRole;

/// 网关身份头: 用户 ID
pub const USER_ID_HEADER: &str = "x-user-id";
/// 网关身份头: 用户角色
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// 当前请求的用户身份
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Parse the gateway identity headers.
    ///
    /// `x-user-id` is required and must be a positive i64; `x-user-role`
    /// defaults to CUSTOMER when absent but is rejected when malformed
    /// (a garbled role header means gateway misconfiguration, not a
    /// guest request).
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, &'static str> {
        let raw_id = headers.get(USER_ID_HEADER).ok_or("missing x-user-id")?;
        let id = raw_id
            .to_str()
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or("malformed x-user-id")?;
        if id <= 0 {
            return Err("malformed x-user-id");
        }

        let role = match headers.get(USER_ROLE_HEADER) {
            Some(v) => v
                .to_str()
                .ok()
                .and_then(|v| v.parse::<UserRole>().ok())
                .ok_or("malformed x-user-role")?,
            None => UserRole::Customer,
        };

        Ok(Self { id, role })
    }
}
