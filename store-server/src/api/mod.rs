//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查 (公共路由, 不要求网关身份)
//! - [`orders`] - 订单接口 (创建/查询/更新/取消/统计)

pub mod health;
pub mod orders;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
