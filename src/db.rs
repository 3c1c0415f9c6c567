// ==========================================
// 工地材料进场导入 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 三张进场表 + config_kv 的建表语句（幂等）
// ==========================================

use crate::domain::types::REBAR_DIAMETERS_MM;
use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 钢筋分档列名（q8 / q10 / ... / q32）
pub fn rebar_bucket_column(diameter_mm: u32) -> String {
    format!("q{}", diameter_mm)
}

/// 创建进场表与配置表（IF NOT EXISTS）
///
/// 说明：
/// - 每张进场表在 (date, supplier_key, waybill_key) 上建唯一索引
/// - supplier_key / waybill_key 为去重主键的标准化文本
pub fn init_delivery_schema(conn: &Connection) -> rusqlite::Result<()> {
    let rebar_buckets: String = REBAR_DIAMETERS_MM
        .iter()
        .map(|d| format!("    {} REAL NOT NULL DEFAULT 0,\n", rebar_bucket_column(*d)))
        .collect();

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS concrete_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    supplier TEXT NOT NULL,
    waybill_no TEXT NOT NULL,
    key_source TEXT NOT NULL,
    supplier_key TEXT NOT NULL,
    waybill_key TEXT NOT NULL,
    concrete_class TEXT NOT NULL,
    delivery_method TEXT NOT NULL,
    quantity_m3 REAL NOT NULL CHECK (quantity_m3 > 0),
    location_block TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_concrete_logs_dedup
    ON concrete_logs (date, supplier_key, waybill_key);

CREATE TABLE IF NOT EXISTS rebar_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    supplier TEXT NOT NULL,
    waybill_no TEXT NOT NULL,
    key_source TEXT NOT NULL,
    supplier_key TEXT NOT NULL,
    waybill_key TEXT NOT NULL,
    project_stage TEXT,
    manufacturer TEXT,
{rebar_buckets}    total_weight_kg REAL NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_rebar_logs_dedup
    ON rebar_logs (date, supplier_key, waybill_key);

CREATE TABLE IF NOT EXISTS mesh_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    supplier TEXT NOT NULL,
    waybill_no TEXT NOT NULL,
    key_source TEXT NOT NULL,
    supplier_key TEXT NOT NULL,
    waybill_key TEXT NOT NULL,
    mesh_type TEXT NOT NULL,
    dimensions TEXT,
    piece_count INTEGER NOT NULL DEFAULT 0,
    weight_kg REAL NOT NULL DEFAULT 0,
    usage_location TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_mesh_logs_dedup
    ON mesh_logs (date, supplier_key, waybill_key);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (scope_id, key)
);
"#
    );

    conn.execute_batch(&sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_delivery_schema(&conn).unwrap();
        init_delivery_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('concrete_logs','rebar_logs','mesh_logs','config_kv')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);

        let has_q32: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('rebar_logs') WHERE name = 'q32'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(has_q32, 1);
    }
}
