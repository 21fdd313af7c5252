use std::sync::Arc;

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;
use crate::orders::OrderNumberGenerator;
use crate::utils::AppError;

/// 服务器状态 - 持有所有共享资源的单例引用
///
/// Axum handler 通过 `State(state)` 获取。Clone 是浅拷贝
/// (连接池和序号生成器均为引用计数)。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 (WAL) |
/// | order_numbers | Arc<OrderNumberGenerator> | 订单号生成器 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// 订单号生成器 (进程级单例，序号段原子递增)
    pub order_numbers: Arc<OrderNumberGenerator>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 数据目录 (确保存在)
    /// 2. 数据库 (data_dir/store.db, WAL + 迁移)
    /// 3. 订单号生成器
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| AppError::internal(format!("Failed to create data dir: {e}")))?;

        let db = DbService::new(&config.database_path()).await?;

        Ok(Self {
            config: config.clone(),
            pool: db.pool,
            order_numbers: Arc::new(OrderNumberGenerator::new()),
        })
    }
}
