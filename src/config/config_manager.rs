// ==========================================
// 工地材料进场导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::import_settings::{ImportSettings, MAX_PAGE_SIZE};
use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 随导入报告一起记录本次导入所用参数
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复 global 配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> RepositoryResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for (key, value) in &config_map {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(count)
    }

    /// 读取并解析配置值；缺失回落默认值，格式错误告警后回落默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ImportResult<T>
    where
        T: FromStr + Display,
    {
        let raw = self
            .get_config_value(key)
            .map_err(|e| ImportError::ConfigReadError {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        match raw {
            None => Ok(default),
            Some(value) => match value.trim().parse::<T>() {
                Ok(parsed) => Ok(parsed),
                Err(_) => {
                    tracing::warn!(
                        config_key = key,
                        raw_value = %value,
                        default = %default,
                        "配置格式错误，使用默认值"
                    );
                    Ok(default)
                }
            },
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_page_size(&self) -> ImportResult<usize> {
        let default = ImportSettings::default().page_size;
        let value = self.get_parsed_or_default(config_keys::PAGE_SIZE, default)?;
        Ok(if value == 0 { default } else { value.min(MAX_PAGE_SIZE) })
    }

    async fn get_max_pages(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::MAX_PAGES, ImportSettings::default().max_pages)
    }

    async fn get_chunk_size(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::CHUNK_SIZE, ImportSettings::default().chunk_size)
    }

    async fn get_header_scan_rows(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(
            config_keys::HEADER_SCAN_ROWS,
            ImportSettings::default().header_scan_rows,
        )
    }

    async fn get_header_min_matches(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(
            config_keys::HEADER_MIN_MATCHES,
            ImportSettings::default().header_min_matches,
        )
    }

    async fn get_min_rebar_total_kg(&self) -> ImportResult<f64> {
        self.get_parsed_or_default(
            config_keys::MIN_REBAR_TOTAL_KG,
            ImportSettings::default().min_rebar_total_kg,
        )
    }

    async fn get_default_location_block(&self) -> ImportResult<String> {
        self.get_parsed_or_default(
            config_keys::DEFAULT_LOCATION_BLOCK,
            ImportSettings::default().default_location_block,
        )
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 远端对账
    pub const PAGE_SIZE: &str = "import.page_size";
    pub const MAX_PAGES: &str = "import.max_pages";

    // 批量写入
    pub const CHUNK_SIZE: &str = "import.chunk_size";

    // 表头定位
    pub const HEADER_SCAN_ROWS: &str = "import.header_scan_rows";
    pub const HEADER_MIN_MATCHES: &str = "import.header_min_matches";

    // 行分类
    pub const MIN_REBAR_TOTAL_KG: &str = "import.min_rebar_total_kg";
    pub const DEFAULT_LOCATION_BLOCK: &str = "import.default_location_block";
}
