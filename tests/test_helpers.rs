// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、CSV 样例文件、内存原始表与测试用配置
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use site_delivery_import::config::{ImportConfigReader, ImportSettings};
use site_delivery_import::db::init_delivery_schema;
use site_delivery_import::domain::{CellValue, RawTable};
use site_delivery_import::importer::ImportResult;
use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    init_delivery_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入 CSV 样例文件（每个元素一行）
pub fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut temp_file = tempfile::Builder::new()
        .prefix("haftalik_")
        .suffix(".csv")
        .tempfile()
        .unwrap();
    for line in lines {
        writeln!(temp_file, "{}", line).unwrap();
    }
    temp_file.flush().unwrap();
    temp_file
}

/// 由文本二维数组构造原始表（首行为列名，空字符串为空单元格）
pub fn raw_table(sheet_name: &str, rows: &[&[&str]]) -> RawTable {
    let grid = rows
        .iter()
        .map(|row| row.iter().map(|v| CellValue::from(*v)).collect())
        .collect();
    RawTable::from_grid(sheet_name, grid)
}

/// 5 行混凝土周报样例
///
/// - 第 2 行: 正常
/// - 第 3 行: 方量为空
/// - 第 4 行: 与第 2 行重复
/// - 第 5 行: 正常（逗号小数）
/// - 第 6 行: 运单号为空 → 合成主键
pub fn concrete_week_csv() -> NamedTempFile {
    write_csv(&[
        "Tarih;Firma;İrsaliye No;Beton Sınıfı;Miktar (m3);Döküm Şekli;Blok",
        "24.11.2023;Albayrak Beton;1001;C30/37;8;POMPALI;A",
        "24.11.2023;Albayrak Beton;1002;C30;;MİKSERLİ;A",
        "24.11.2023;Albayrak Beton;1001;C30;8;POMPALI;A",
        "2023-11-25;Özyurt;2001;C25;12,5;;B",
        "25.11.2023;Özyurt;;C25;7;;B",
    ])
}

// ==========================================
// FixedConfig - 测试用配置读取器
// ==========================================
pub struct FixedConfig(pub ImportSettings);

impl FixedConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self(ImportSettings {
            chunk_size,
            ..ImportSettings::default()
        })
    }
}

#[async_trait]
impl ImportConfigReader for FixedConfig {
    async fn get_page_size(&self) -> ImportResult<usize> {
        Ok(self.0.page_size)
    }

    async fn get_max_pages(&self) -> ImportResult<usize> {
        Ok(self.0.max_pages)
    }

    async fn get_chunk_size(&self) -> ImportResult<usize> {
        Ok(self.0.chunk_size)
    }

    async fn get_header_scan_rows(&self) -> ImportResult<usize> {
        Ok(self.0.header_scan_rows)
    }

    async fn get_header_min_matches(&self) -> ImportResult<usize> {
        Ok(self.0.header_min_matches)
    }

    async fn get_min_rebar_total_kg(&self) -> ImportResult<f64> {
        Ok(self.0.min_rebar_total_kg)
    }

    async fn get_default_location_block(&self) -> ImportResult<String> {
        Ok(self.0.default_location_block.clone())
    }
}
