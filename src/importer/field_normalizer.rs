// ==========================================
// 工地材料进场导入 - 字段标准化器
// ==========================================
// 职责: 日期解析（多格式、日在前）/ 数值解析（千分位与小数点判别）/ 文本清洗
// 红线: 空数值视为 0（可选字段可留空），主数量是否为 0 由行分类器判定
// ==========================================

use crate::domain::raw_table::CellValue;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

/// 文本日期格式（按优先级，日在前）
pub const DATE_FORMATS: [&str; 4] = ["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y", "%Y.%m.%d"];

/// 合理年份范围（两位年份等误解析在此拦截）
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// Excel 序列日期上限（9999-12-31）
const EXCEL_SERIAL_MAX: f64 = 2_958_466.0;

/// 单字段标准化错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("日期无法解析: {0}")]
    UnparsableDate(String),

    #[error("数值无法解析: {0}")]
    UnparsableNumber(String),
}

pub struct FieldNormalizer;

impl FieldNormalizer {
    // ===== 日期 =====

    /// 解析日期单元格
    ///
    /// # 规则
    /// - Date / DateTime 单元格直接取日期
    /// - Number 单元格按 Excel 序列日期换算
    /// - Text 单元格去掉时间部分后依次尝试 DATE_FORMATS
    pub fn parse_date(&self, cell: &CellValue) -> Result<NaiveDate, NormalizeError> {
        match cell {
            CellValue::Date(d) => Ok(*d),
            CellValue::DateTime(dt) => Ok(dt.date()),
            CellValue::Number(serial) => excel_serial_to_datetime(*serial)
                .map(|dt| dt.date())
                .ok_or_else(|| NormalizeError::UnparsableDate(cell.as_text())),
            CellValue::Text(s) => self.parse_date_text(s),
            CellValue::Empty | CellValue::Bool(_) => {
                Err(NormalizeError::UnparsableDate(cell.as_text()))
            }
        }
    }

    /// 解析文本日期（"24.11.2023" / "2023-11-24 00:00:00" / "24/11/2023" / "2023.11.24"）
    pub fn parse_date_text(&self, value: &str) -> Result<NaiveDate, NormalizeError> {
        let trimmed = value.trim();
        let date_part = trimmed
            .split(|c: char| c == ' ' || c == 'T')
            .next()
            .unwrap_or(trimmed);

        DATE_FORMATS
            .iter()
            .filter_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
            .find(|d| (MIN_YEAR..=MAX_YEAR).contains(&chrono::Datelike::year(d)))
            .ok_or_else(|| NormalizeError::UnparsableDate(trimmed.to_string()))
    }

    /// 标准日期文本（YYYY-MM-DD）
    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    // ===== 数值 =====

    /// 解析数值单元格（空白 → 0）
    pub fn parse_number(&self, cell: &CellValue) -> Result<f64, NormalizeError> {
        match cell {
            CellValue::Number(n) => Ok(*n),
            CellValue::Empty => Ok(0.0),
            CellValue::Text(s) => self.parse_number_text(s),
            CellValue::Bool(_) | CellValue::Date(_) | CellValue::DateTime(_) => {
                Err(NormalizeError::UnparsableNumber(cell.as_text()))
            }
        }
    }

    /// 解析文本数值，兼容 "1.234,56" 与 "1,234.56"
    ///
    /// # 规则
    /// 1. 仅保留数字、逗号、点（前导负号单独保留）
    /// 2. 逗号与点同时出现：先出现者为千分位（全部删除），后出现者为小数点
    /// 3. 只有一种分隔符且出现多次：视为千分位
    /// 4. 只有一个逗号：视为小数点
    /// 5. 清洗后为空 → 0
    pub fn parse_number_text(&self, value: &str) -> Result<f64, NormalizeError> {
        let trimmed = value.trim();
        let negative = trimmed.starts_with('-');
        let kept: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .collect();

        if kept.is_empty() {
            return Ok(0.0);
        }

        let normalized = match (kept.find(','), kept.find('.')) {
            (Some(comma), Some(dot)) => {
                let (thousands, decimal) = if comma < dot { (',', '.') } else { ('.', ',') };
                kept.replace(thousands, "").replace(decimal, ".")
            }
            (Some(_), None) => {
                if kept.matches(',').count() > 1 {
                    kept.replace(',', "")
                } else {
                    kept.replace(',', ".")
                }
            }
            (None, Some(_)) => {
                if kept.matches('.').count() > 1 {
                    kept.replace('.', "")
                } else {
                    kept
                }
            }
            (None, None) => kept,
        };

        let parsed = normalized
            .parse::<f64>()
            .map_err(|_| NormalizeError::UnparsableNumber(trimmed.to_string()))?;

        Ok(if negative { -parsed } else { parsed })
    }

    // ===== 文本 =====

    /// 清洗文本（TRIM，可选 UPPER，空白 → None）
    pub fn clean_text(&self, cell: &CellValue, uppercase: bool) -> Option<String> {
        let text = cell.as_text();
        if text.is_empty() {
            None
        } else if uppercase {
            Some(text.to_uppercase())
        } else {
            Some(text)
        }
    }
}

/// 大写 + 土耳其语变音折叠（İ/ı→I, Ş→S, Ğ→G, Ü→U, Ö→O, Ç→C）
///
/// 用于表头关键字、列名模式与合计行标记的匹配
pub fn fold_upper(value: &str) -> String {
    value
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| *c != '\u{0307}')
        .map(|c| match c {
            'İ' | 'I' | 'Ì' | 'Í' | 'Î' => 'I',
            'Ş' => 'S',
            'Ğ' => 'G',
            'Ü' | 'Û' => 'U',
            'Ö' => 'O',
            'Ç' => 'C',
            'Â' | 'À' | 'Á' => 'A',
            other => other,
        })
        .collect()
}

/// 数值显示文本（整数不带小数部分，其余最多 3 位小数）
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{:.3}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Excel 序列日期 → NaiveDateTime（1900 日期系统，基准 1899-12-30）
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !(1.0..EXCEL_SERIAL_MAX).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial.fract()) * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}
