// ==========================================
// 工地材料进场导入 - 钢筋直径汇总器
// ==========================================
// 职责: 识别直径列（10'LUK / Q10 / Ø10 MM / FİLMAŞİN 10 ...）并按分档汇总重量
// 规则: 24mm 无标准分档，并入 25mm 并在备注中说明
// ==========================================

use crate::domain::raw_table::RawRow;
use crate::domain::types::{
    DiameterWeights, FOLDED_DIAMETER_MM, FOLD_TARGET_DIAMETER_MM, REBAR_DIAMETERS_MM,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::{fold_upper, format_number, FieldNormalizer, NormalizeError};
use regex::Regex;
use thiserror::Error;

/// 直径列匹配（作用于折叠后的列名）
const DIAMETER_PATTERN: &str = r"(?:^|[\s_\-(/]|Q|Ø|FI)(\d{1,2})(?:\s|'|’|´|LIK|LUK|MM|$|[)\-_])";

/// 读取器生成的占位列名前缀
const PLACEHOLDER_PREFIX: &str = "COLUMN_";

#[derive(Debug, Clone, PartialEq)]
pub struct DiameterColumn {
    pub diameter_mm: u32, // 源直径（可能为 24）
    pub index: usize,
    pub label: String,
}

/// 单行汇总结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedWeights {
    pub weights: DiameterWeights,
    pub folded_kg: f64, // 并入 25mm 的 24mm 重量
}

impl AggregatedWeights {
    /// 24mm 并档备注（并档重量 > 0 时）
    pub fn fold_note(&self) -> Option<String> {
        (self.folded_kg > 0.0).then(|| format!("{}kg Q24 dahil", format_number(self.folded_kg)))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiameterCellProblem {
    #[error(transparent)]
    Unparsable(NormalizeError),

    #[error("直径分档重量为负数: {0}")]
    Negative(f64),
}

/// 直径单元格无法使用（解析失败或为负数）
#[derive(Debug, Clone, PartialEq)]
pub struct DiameterCellError {
    pub label: String,
    pub problem: DiameterCellProblem,
}

pub struct DiameterAggregator {
    pattern: Regex,
}

impl DiameterAggregator {
    pub fn new() -> ImportResult<Self> {
        let pattern = Regex::new(DIAMETER_PATTERN)
            .map_err(|e| ImportError::InternalError(format!("直径列模式编译失败: {}", e)))?;
        Ok(Self { pattern })
    }

    fn is_known_diameter(d: u32) -> bool {
        d == FOLDED_DIAMETER_MM || REBAR_DIAMETERS_MM.contains(&d)
    }

    /// 识别列名中的直径（首个已知直径）
    pub fn diameter_of(&self, label: &str) -> Option<u32> {
        let folded = fold_upper(label);
        if folded.starts_with(PLACEHOLDER_PREFIX) {
            return None;
        }
        self.pattern
            .captures_iter(&folded)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .find(|d| Self::is_known_diameter(*d))
    }

    /// 找出全部直径列（同一直径可对应多列）
    pub fn discover(&self, labels: &[String]) -> Vec<DiameterColumn> {
        labels
            .iter()
            .enumerate()
            .filter_map(|(index, label)| {
                self.diameter_of(label).map(|diameter_mm| DiameterColumn {
                    diameter_mm,
                    index,
                    label: label.clone(),
                })
            })
            .collect()
    }

    /// 汇总单行各直径列
    ///
    /// # 返回
    /// - Ok(AggregatedWeights): 24mm 已并入 25mm
    /// - Err(DiameterCellError): 任一直径单元格无法解析或为负数（在求和与并档之前检查）
    pub fn aggregate(
        row: &RawRow,
        columns: &[DiameterColumn],
        normalizer: &FieldNormalizer,
    ) -> Result<AggregatedWeights, DiameterCellError> {
        let mut result = AggregatedWeights::default();

        for column in columns {
            let kg = normalizer
                .parse_number(row.cell(column.index))
                .map_err(|error| DiameterCellError {
                    label: column.label.clone(),
                    problem: DiameterCellProblem::Unparsable(error),
                })?;
            if kg < 0.0 {
                return Err(DiameterCellError {
                    label: column.label.clone(),
                    problem: DiameterCellProblem::Negative(kg),
                });
            }

            if column.diameter_mm == FOLDED_DIAMETER_MM {
                result.weights.add(FOLD_TARGET_DIAMETER_MM, kg);
                result.folded_kg += kg;
            } else {
                result.weights.add(column.diameter_mm, kg);
            }
        }

        Ok(result)
    }
}
