// ==========================================
// 工地材料进场导入 - 导入批次与结果报告
// ==========================================
// 用途: 导入接口返回值（由外部 UI 层展示）
// 红线: 行级问题只累计到报告，不中断批次
// ==========================================

use crate::domain::delivery::CanonicalRecord;
use crate::domain::types::Material;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// RowErrorKind - 行级错误类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowErrorKind {
    MissingMandatoryField,  // 必填字段为空
    UnparsableDate,         // 日期无法解析
    UnparsableNumber,       // 数值无法解析
    InvalidPrimaryQuantity, // 主数量非法（负数等）
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowErrorKind::MissingMandatoryField => write!(f, "MISSING_MANDATORY_FIELD"),
            RowErrorKind::UnparsableDate => write!(f, "UNPARSABLE_DATE"),
            RowErrorKind::UnparsableNumber => write!(f, "UNPARSABLE_NUMBER"),
            RowErrorKind::InvalidPrimaryQuantity => write!(f, "INVALID_PRIMARY_QUANTITY"),
        }
    }
}

// ==========================================
// RowError - 行级错误记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row_number: usize, // 源表格行号
    pub kind: RowErrorKind,
    pub field: String,     // 标准字段名
    pub reason: String,    // 可读原因
}

// ==========================================
// SkipReason - 静默跳过原因（非错误）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    BlankRow,            // 空行
    TotalRow,            // 合计/小计行
    NonPositiveQuantity, // 主数量 <= 0（占位行）
}

// ==========================================
// SheetFailure - 工作表级失败（多表导入时记录后跳过）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetFailure {
    pub sheet_name: String,
    pub reason: String,
}

// ==========================================
// PreparedBatch - 待提交批次
// ==========================================
// 解析 + 分类完成、尚未与远端对账的批次；UI 层在提交前展示错误列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedBatch {
    pub material: Material,
    pub sheet_names: Vec<String>,
    pub total_rows: usize,           // 参与分类的数据行数
    pub records: Vec<CanonicalRecord>,
    pub errors: Vec<RowError>,
    pub skipped_rows: usize,         // 空行 / 合计行 / 非正数量
    pub duplicate_in_batch: usize,   // 同批次重复（后出现者丢弃）
    pub sheet_failures: Vec<SheetFailure>,
}

impl PreparedBatch {
    pub fn empty(material: Material) -> Self {
        Self {
            material,
            sheet_names: Vec::new(),
            total_rows: 0,
            records: Vec::new(),
            errors: Vec::new(),
            skipped_rows: 0,
            duplicate_in_batch: 0,
            sheet_failures: Vec::new(),
        }
    }
}

// ==========================================
// ChunkFailure - 分块写入失败
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_index: usize, // 分块序号（0 起）
    pub size: usize,        // 该分块记录数
    pub reason: String,
}

// ==========================================
// ImportReport - 导入结果报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: String,              // 批次 ID（UUID）
    pub material: Material,
    pub total_rows: usize,             // 数据行数
    pub accepted: usize,               // 实际写入远端
    pub skipped_duplicate: usize,      // 远端已存在（非错误）
    pub duplicate_in_batch: usize,     // 同批次重复（非错误）
    pub skipped_rows: usize,           // 静默跳过行
    pub failed: usize,                 // 写入失败记录数（按分块累计）
    pub errors: Vec<RowError>,         // 行级错误（未到达远端）
    pub chunk_failures: Vec<ChunkFailure>,
    pub sheet_failures: Vec<SheetFailure>,
    pub elapsed_ms: u128,
}

impl ImportReport {
    /// 是否部分成功（有分块失败但也有写入）
    pub fn is_partial(&self) -> bool {
        self.failed > 0 && self.accepted > 0
    }
}
