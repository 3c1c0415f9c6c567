// ==========================================
// 工地材料进场导入 - 表格读取器实现
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb/.ods) / CSV (.csv)
// 输出: RawTable（首行为临时列名，保留空行与行号）
// ==========================================

use crate::domain::raw_table::{CellValue, RawTable};
use crate::importer::delivery_importer_trait::FileParser;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::excel_serial_to_datetime;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::fs;
use std::path::Path;

const EXCEL_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 分隔符探测：首行分号多于逗号时使用 ';'
    pub fn sniff_delimiter(content: &str) -> u8 {
        let first_line = content.lines().next().unwrap_or("");
        let semicolons = first_line.matches(';').count();
        let commas = first_line.matches(',').count();
        if semicolons > commas {
            b';'
        } else {
            b','
        }
    }

    fn table_name(path: &Path) -> String {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string()
    }
}

impl FileParser for CsvParser {
    fn sheet_names(&self, file_path: &Path) -> ImportResult<Vec<String>> {
        ensure_exists(file_path)?;
        Ok(vec![Self::table_name(file_path)])
    }

    fn read_sheet(&self, file_path: &Path, _sheet: Option<&str>) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let bytes = fs::read(file_path)?;
        let content = String::from_utf8_lossy(&bytes);
        let content = content.trim_start_matches('\u{feff}');

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(Self::sniff_delimiter(content))
            .from_reader(content.as_bytes());

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            // csv 跳过完全空白的行，按行号补齐以保持源表格行号
            if let Some(line) = record.position().map(|p| p.line() as usize) {
                while grid.len() + 1 < line {
                    grid.push(Vec::new());
                }
            }
            grid.push(record.iter().map(CellValue::from).collect::<Vec<_>>());
        }

        Ok(RawTable::from_grid(&Self::table_name(file_path), grid))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// calamine 单元格 → CellValue
    pub fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::from(s.as_str()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                match excel_serial_to_datetime(serial) {
                    Some(value) if serial.fract() == 0.0 => CellValue::Date(value.date()),
                    Some(value) => CellValue::DateTime(value),
                    // 纯时间值（序列 < 1）按数值保留
                    None => CellValue::Number(serial),
                }
            }
            Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .map(CellValue::DateTime)
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(CellValue::Date))
                .unwrap_or_else(|_| CellValue::from(s.as_str())),
            Data::DurationIso(s) => CellValue::from(s.as_str()),
            Data::Error(_) => CellValue::Empty,
        }
    }
}

impl FileParser for ExcelParser {
    fn sheet_names(&self, file_path: &Path) -> ImportResult<Vec<String>> {
        ensure_exists(file_path)?;
        let workbook = open_workbook_auto(file_path)?;
        Ok(workbook.sheet_names())
    }

    fn read_sheet(&self, file_path: &Path, sheet: Option<&str>) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if !EXCEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names();

        let sheet_name = match sheet {
            Some(name) => sheet_names
                .iter()
                .find(|s| s.as_str() == name)
                .cloned()
                .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))?,
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;

        // Range 起点为 0 起的绝对行号（顶部空行被裁掉）
        let first_row_number = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

        let grid: Vec<Vec<CellValue>> = range
            .rows()
            .map(|row| row.iter().map(Self::convert_cell).collect())
            .collect();

        Ok(RawTable::from_grid_at(&sheet_name, grid, first_row_number))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    fn delegate(&self, file_path: &Path) -> ImportResult<&'static dyn FileParser> {
        let ext = extension_of(file_path);
        match ext.as_str() {
            "csv" => Ok(&CsvParser),
            e if EXCEL_EXTENSIONS.contains(&e) => Ok(&ExcelParser),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

impl FileParser for UniversalFileParser {
    fn sheet_names(&self, file_path: &Path) -> ImportResult<Vec<String>> {
        self.delegate(file_path)?.sheet_names(file_path)
    }

    fn read_sheet(&self, file_path: &Path, sheet: Option<&str>) -> ImportResult<RawTable> {
        self.delegate(file_path)?.read_sheet(file_path, sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(lines: &[&str]) -> NamedTempFile {
        let mut temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_keeps_blank_rows_and_numbers() {
        let temp_file = csv_file(&["TARİH,FİRMA,MİKTAR", "24.11.2023,Albayrak,12", ",,", "25.11.2023,Özyurt,8"]);

        let table = CsvParser.read_sheet(temp_file.path(), None).unwrap();

        assert_eq!(table.labels, vec!["TARİH", "FİRMA", "MİKTAR"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].row_number, 2);
        assert_eq!(table.rows[0].cell(1), &CellValue::Text("Albayrak".to_string()));
        assert!(table.rows[1].is_blank());
        assert_eq!(table.rows[2].row_number, 4);
    }

    #[test]
    fn test_csv_parser_empty_lines_keep_row_numbers() {
        let temp_file = csv_file(&["BETON TAKİP", "", "TARİH,FİRMA,MİKTAR", "24.11.2023,Albayrak,12"]);

        let table = CsvParser.read_sheet(temp_file.path(), None).unwrap();

        assert_eq!(table.rows.len(), 3);
        assert!(table.rows[0].is_blank());
        assert_eq!(table.rows[2].row_number, 4);
    }

    #[test]
    fn test_csv_parser_semicolon_delimiter() {
        let temp_file = csv_file(&["TARİH;FİRMA;MİKTAR", "24.11.2023;Albayrak;12,5"]);

        let table = CsvParser.read_sheet(temp_file.path(), None).unwrap();

        assert_eq!(table.labels.len(), 3);
        assert_eq!(table.rows[0].cell(2), &CellValue::Text("12,5".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.read_sheet(Path::new("non_existent.csv"), None);
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.read_sheet(temp_file.path(), None);
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_convert_excel_cells() {
        assert_eq!(ExcelParser::convert_cell(&Data::Int(14500)), CellValue::Number(14500.0));
        assert_eq!(ExcelParser::convert_cell(&Data::String("  ".to_string())), CellValue::Empty);
        assert_eq!(
            ExcelParser::convert_cell(&Data::DateTimeIso("2023-11-24".to_string())),
            CellValue::Date(NaiveDate::from_ymd_opt(2023, 11, 24).unwrap())
        );
    }
}
