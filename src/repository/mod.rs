// ==========================================
// 工地材料进场导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑（去重 / 分类在导入层完成）
// ==========================================
// 职责: 远端日志表的分页读取与分块写入
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod delivery_store;
pub mod delivery_store_impl;
pub mod error;

// 重导出核心仓储
pub use delivery_store::DeliveryStore;
pub use delivery_store_impl::SqliteDeliveryStore;
pub use error::{RepositoryError, RepositoryResult};
