//! Order Domain
//!
//! 订单核心: 从购物车式的行项目请求到落库订单的完整流程.
//!
//! - `pricing`: 金额计算 (Decimal 内部计算, f64 存储)
//! - `number`: 订单号生成 (唯一性由数据库约束保证)
//! - `transition`: 状态机合法迁移表
//! - `validator`: 地址归属 + 商品/规格解析 + 库存预检
//! - `service`: 编排层, handler 只调这里

pub mod number;
pub mod pricing;
pub mod service;
pub mod transition;
pub mod validator;

pub use number::OrderNumberGenerator;
