// ==========================================
// 工地材料进场导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 范围: 仅工作表级 / 批次级致命错误；行级问题进入 ImportReport.errors
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.xlsb/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    // ===== 工作表级致命错误 =====
    #[error("未找到表头 (工作表 {sheet}): 前 {scanned} 行中没有命中 {min_matches} 个以上关键字的行")]
    HeaderNotFound {
        sheet: String,
        scanned: usize,
        min_matches: usize,
    },

    #[error("必填列缺失 (工作表 {sheet}): {field}")]
    MissingMandatoryColumn { sheet: String, field: String },

    // ===== 远端存储错误 =====
    #[error("远端存储操作失败: {0}")]
    Store(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为“该表不是数据表”类错误（多表导入时跳过而非中断）
    pub fn is_sheet_scoped(&self) -> bool {
        matches!(
            self,
            ImportError::HeaderNotFound { .. } | ImportError::MissingMandatoryColumn { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
