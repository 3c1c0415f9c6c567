// ==========================================
// 工地材料进场导入 - 领域模型层
// ==========================================
// 职责: 定义原始表格、标准化记录、导入报告等领域类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod delivery;
pub mod import_report;
pub mod raw_table;
pub mod types;

// 重导出核心类型
pub use delivery::{
    CanonicalRecord, ConcreteDelivery, DedupKey, ExistingDelivery, KeySource, MeshDelivery,
    RebarDelivery,
};
pub use import_report::{
    ChunkFailure, ImportReport, PreparedBatch, RowError, RowErrorKind, SheetFailure, SkipReason,
};
pub use raw_table::{CellValue, RawRow, RawTable};
pub use types::{
    ConcreteClass, DeliveryMethod, DiameterWeights, Material, MeshType, REBAR_DIAMETERS_MM,
};
