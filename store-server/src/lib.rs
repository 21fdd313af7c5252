//! Store Server - 电商订单处理核心服务
//!
//! # 架构概述
//!
//! 本模块是订单服务的主入口，提供以下核心功能：
//!
//! - **订单核心** (`orders`): 定价、校验、订单号、状态机、下单编排
//! - **数据库** (`db`): SQLite (WAL) 连接池、迁移、仓储层
//! - **身份** (`auth`): 网关注入的用户身份 (认证在上游完成)
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! store-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # 网关身份提取、管理员门禁
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单领域逻辑
//! ├── db/            # 数据库层 (仓储)
//! └── utils/         # 错误、日志、时间、校验
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use auth::CurrentUser;
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Audit logging macro - 订单领域事件走 tracing 的 audit target,
// 尾部字段按 token 原样转发, 保留 tracing 的 % / ? 记法
#[macro_export]
macro_rules! audit_log {
    ($action:expr, $resource:expr, $id:expr $(, $($arg:tt)*)?) => {
        tracing::info!(
            target: "audit",
            action = $action,
            resource = $resource,
            id = %$id
            $(, $($arg)*)?
        );
    };
}

// Security logging macro - 同样转发尾部字段
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr $(, $($arg:tt)*)?) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event
            $(, $($arg)*)?
        );
    };
}

/// 进程级环境准备 (dotenv + 日志)，在加载配置之前调用
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), None, log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____ __
  / ___// /_____  ________
  \__ \/ __/ __ \/ ___/ _ \
 ___/ / /_/ /_/ / /  /  __/
/____/\__/\____/_/   \___/
    "#
    );
}
