// ==========================================
// 工地材料进场导入 - 导入参数快照
// ==========================================
// 职责: 一次导入所用的全部参数（导入开始时解析一次）
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::importer::error::ImportResult;
use serde::{Deserialize, Serialize};

/// 分页大小上限（远端单次最多返回 1000 行）
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub page_size: usize,
    pub max_pages: usize,
    pub chunk_size: usize,
    pub header_scan_rows: usize,
    pub header_min_matches: usize,
    pub min_rebar_total_kg: f64,
    pub default_location_block: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_pages: 10_000,
            chunk_size: 500,
            header_scan_rows: 20,
            header_min_matches: 2,
            min_rebar_total_kg: 1.0,
            default_location_block: "Unknown".to_string(),
        }
    }
}

impl ImportSettings {
    /// 从配置读取器解析
    pub async fn load<C: ImportConfigReader + ?Sized>(reader: &C) -> ImportResult<Self> {
        Ok(Self {
            page_size: reader.get_page_size().await?,
            max_pages: reader.get_max_pages().await?,
            chunk_size: reader.get_chunk_size().await?,
            header_scan_rows: reader.get_header_scan_rows().await?,
            header_min_matches: reader.get_header_min_matches().await?,
            min_rebar_total_kg: reader.get_min_rebar_total_kg().await?,
            default_location_block: reader.get_default_location_block().await?,
        }
        .sanitized())
    }

    /// 钳制到合法范围（0 值回落默认，page_size 不超过上限）
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            page_size: match self.page_size {
                0 => defaults.page_size,
                n => n.min(MAX_PAGE_SIZE),
            },
            max_pages: if self.max_pages == 0 { defaults.max_pages } else { self.max_pages },
            chunk_size: if self.chunk_size == 0 { defaults.chunk_size } else { self.chunk_size },
            header_scan_rows: if self.header_scan_rows == 0 {
                defaults.header_scan_rows
            } else {
                self.header_scan_rows
            },
            header_min_matches: self.header_min_matches.max(1),
            min_rebar_total_kg: if self.min_rebar_total_kg.is_finite() {
                self.min_rebar_total_kg.max(0.0)
            } else {
                defaults.min_rebar_total_kg
            },
            default_location_block: if self.default_location_block.trim().is_empty() {
                defaults.default_location_block
            } else {
                self.default_location_block
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_caps_page_size() {
        let settings = ImportSettings {
            page_size: 5000,
            chunk_size: 0,
            header_min_matches: 0,
            default_location_block: "  ".to_string(),
            ..ImportSettings::default()
        }
        .sanitized();

        assert_eq!(settings.page_size, MAX_PAGE_SIZE);
        assert_eq!(settings.chunk_size, 500);
        assert_eq!(settings.header_min_matches, 1);
        assert_eq!(settings.default_location_block, "Unknown");
    }
}
