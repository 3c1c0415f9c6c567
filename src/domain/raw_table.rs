// ==========================================
// 工地材料进场导入 - 原始表格模型
// ==========================================
// 用途: 表格读取器输出 → 表头定位 / 字段映射 / 行分类的输入
// 生命周期: 仅在单个工作表的导入流程内
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// CellValue - 原始单元格
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 空白判定（Empty 或 仅空白字符的文本）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 显示文本（已 TRIM）
    ///
    /// # 说明
    /// - 整数值浮点去掉 `.0`（Excel 中的纯数字运单号 14500.0 → "14500"）
    /// - 日期统一为 YYYY-MM-DD
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

// ==========================================
// RawRow - 原始行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_number: usize,     // 源表格行号（1 起，用于错误报告）
    pub cells: Vec<CellValue>, // 与 RawTable.labels 按位置对齐
}

impl RawRow {
    /// 按列下标取单元格（越界视为空）
    pub fn cell(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&CellValue::Empty)
    }

    /// 整行是否全空
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }

    /// 指定列是否全空（其余列不参与判断）
    pub fn is_blank_at<I>(&self, indices: I) -> bool
    where
        I: IntoIterator<Item = usize>,
    {
        indices.into_iter().all(|index| self.cell(index).is_blank())
    }
}

// ==========================================
// RawTable - 原始二维表
// ==========================================
// labels 可能是通用占位（COLUMN_1）或空白，允许重名
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub sheet_name: String,
    pub labels: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// 由“首行为列名”的二维单元格构造（与读取器行为一致）
    ///
    /// # 参数
    /// - sheet_name: 工作表名
    /// - grid: 全部单元格（含首行）
    ///
    /// # 说明
    /// - 首行位于源表格第 1 行，数据行从第 2 行开始编号
    pub fn from_grid(sheet_name: &str, grid: Vec<Vec<CellValue>>) -> Self {
        Self::from_grid_at(sheet_name, grid, 1)
    }

    /// 同 from_grid，但首行位于源表格第 first_row_number 行
    ///
    /// # 说明
    /// - calamine 会裁掉表格顶部的空行，需按 Range 起点修正行号
    pub fn from_grid_at(sheet_name: &str, grid: Vec<Vec<CellValue>>, first_row_number: usize) -> Self {
        let mut iter = grid.into_iter();
        let labels = iter
            .next()
            .map(|first| {
                first
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| label_or_placeholder(cell, idx))
                    .collect()
            })
            .unwrap_or_default();

        let rows = iter
            .enumerate()
            .map(|(idx, cells)| RawRow {
                row_number: first_row_number + idx + 1,
                cells,
            })
            .collect();

        Self {
            sheet_name: sheet_name.to_string(),
            labels,
            rows,
        }
    }
}

/// 单元格 → 列名（空白占位为 COLUMN_n，n 从 1 起）
pub fn label_or_placeholder(cell: &CellValue, index: usize) -> String {
    let text = cell.as_text();
    if text.is_empty() {
        format!("COLUMN_{}", index + 1)
    } else {
        text
    }
}
