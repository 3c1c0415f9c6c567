// ==========================================
// 工地材料进场导入 - 表头定位器
// ==========================================
// 职责: 在表格顶部（标题、logo、空行之后）找到真正的表头行
// 规则: 关键字按变音折叠 + 大写后做子串匹配
// ==========================================

use crate::domain::raw_table::{label_or_placeholder, CellValue, RawTable};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::fold_upper;
use tracing::debug;

pub struct HeaderLocator {
    scan_rows: usize,
    min_matches: usize,
}

impl HeaderLocator {
    pub fn new(scan_rows: usize, min_matches: usize) -> Self {
        Self {
            scan_rows,
            min_matches: min_matches.max(1),
        }
    }

    /// 单个文本是否命中任一关键字
    fn hits(text: &str, keywords: &[&str]) -> bool {
        let folded = fold_upper(text);
        !folded.is_empty() && keywords.iter().any(|k| folded.contains(k))
    }

    /// 一行中命中关键字的非空单元格数
    pub fn count_matches(cells: &[CellValue], keywords: &[&str]) -> usize {
        cells
            .iter()
            .filter(|c| !c.is_blank())
            .filter(|c| Self::hits(&c.as_text(), keywords))
            .count()
    }

    /// 定位表头并重建列名
    ///
    /// # 规则
    /// 1. 现有列名已命中 min_matches 个关键字 → 原样返回
    /// 2. 否则扫描前 scan_rows 行，首个命中行作为表头，其上（含）各行丢弃
    /// 3. 均未命中 → HeaderNotFound
    pub fn locate(&self, table: RawTable, keywords: &[&str]) -> ImportResult<RawTable> {
        let label_matches = table
            .labels
            .iter()
            .filter(|l| Self::hits(l, keywords))
            .count();
        if label_matches >= self.min_matches {
            debug!(sheet = %table.sheet_name, label_matches, "首行即为表头");
            return Ok(table);
        }

        let header_index = table
            .rows
            .iter()
            .take(self.scan_rows)
            .position(|row| Self::count_matches(&row.cells, keywords) >= self.min_matches);

        let Some(header_index) = header_index else {
            return Err(ImportError::HeaderNotFound {
                sheet: table.sheet_name,
                scanned: self.scan_rows,
                min_matches: self.min_matches,
            });
        };

        let RawTable {
            sheet_name,
            mut rows,
            ..
        } = table;

        let data_rows = rows.split_off(header_index + 1);
        let header_row = rows.pop();
        let labels = header_row
            .map(|row| {
                row.cells
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| label_or_placeholder(cell, idx))
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            sheet = %sheet_name,
            header_index,
            "表头已定位"
        );

        Ok(RawTable {
            sheet_name,
            labels,
            rows: data_rows,
        })
    }
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self::new(20, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Material;

    fn text_row(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::from(*v)).collect()
    }

    #[test]
    fn test_header_found_at_row_index_3() {
        let grid = vec![
            text_row(&["HAFTALIK BETON RAPORU", "", ""]),
            text_row(&["", "", ""]),
            text_row(&["Proje: Blok A", "", ""]),
            text_row(&["Şantiye Şefliği", "", ""]),
            text_row(&["TARİH", "FİRMA", "MİKTAR (m³)"]),
            text_row(&["24.11.2023", "Albayrak", "12"]),
        ];
        let table = RawTable::from_grid("Sayfa1", grid);

        let located = HeaderLocator::default()
            .locate(table, Material::Concrete.header_keywords())
            .unwrap();

        assert_eq!(located.labels, vec!["TARİH", "FİRMA", "MİKTAR (m³)"]);
        assert_eq!(located.rows.len(), 1);
        assert_eq!(located.rows[0].row_number, 6);
    }

    #[test]
    fn test_existing_labels_kept() {
        let grid = vec![
            text_row(&["Tarih", "Firma", "Miktar"]),
            text_row(&["24.11.2023", "Albayrak", "12"]),
        ];
        let table = RawTable::from_grid("Sayfa1", grid);

        let located = HeaderLocator::default()
            .locate(table.clone(), Material::Concrete.header_keywords())
            .unwrap();

        assert_eq!(located, table);
    }

    #[test]
    fn test_blank_header_cells_get_placeholders() {
        let grid = vec![
            text_row(&["", "", ""]),
            text_row(&["TARİH", "", "İRSALİYE NO"]),
            text_row(&["24.11.2023", "x", "1"]),
        ];
        let located = HeaderLocator::default()
            .locate(RawTable::from_grid("S", grid), Material::Mesh.header_keywords())
            .unwrap();

        assert_eq!(located.labels, vec!["TARİH", "COLUMN_2", "İRSALİYE NO"]);
    }

    #[test]
    fn test_header_not_found() {
        let grid = vec![
            text_row(&["Notlar", ""]),
            text_row(&["bir", "iki"]),
        ];
        let result = HeaderLocator::new(20, 2)
            .locate(RawTable::from_grid("Notlar", grid), Material::Rebar.header_keywords());

        match result {
            Err(ImportError::HeaderNotFound { sheet, .. }) => assert_eq!(sheet, "Notlar"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_scan_window_limit() {
        let mut grid = vec![text_row(&["x"])];
        for _ in 0..5 {
            grid.push(text_row(&[""]));
        }
        grid.push(text_row(&["TARİH", "FİRMA"]));

        let result = HeaderLocator::new(3, 2)
            .locate(RawTable::from_grid("S", grid), Material::Concrete.header_keywords());
        assert!(result.is_err());
    }
}
