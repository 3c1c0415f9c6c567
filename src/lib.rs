// ==========================================
// 工地材料进场导入 - 核心库
// ==========================================
// 职责: 工地周报表格（混凝土 / 钢筋 / 钢筋网）导入、标准化、去重、上传
// 技术栈: Rust + calamine/csv + SQLite
// 系统定位: 导入引擎（展示与人工确认由外部 UI 层负责）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 原始表格与标准化记录
pub mod domain;

// 数据仓储层 - 远端日志表
pub mod repository;

// 导入层 - 解析 / 分类 / 对账 / 上传
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/表结构）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConcreteClass, DeliveryMethod, Material, MeshType};

// 领域实体
pub use domain::{
    CanonicalRecord, ConcreteDelivery, DedupKey, ImportReport, MeshDelivery, PreparedBatch,
    RawTable, RebarDelivery, RowError, RowErrorKind,
};

// 导入器
pub use importer::{DeliveryImporter, DeliveryImporterImpl, ImportError, ImportResult};

// 仓储
pub use repository::{DeliveryStore, RepositoryError, SqliteDeliveryStore};

// 配置
pub use config::{ConfigManager, ImportConfigReader, ImportSettings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
