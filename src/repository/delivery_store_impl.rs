// ==========================================
// 工地材料进场导入 - 远端存储 SQLite 实现
// ==========================================
// 职责: concrete_logs / rebar_logs / mesh_logs 的分页读取与分块追加
// 红线: 每次 insert_batch 一个事务；唯一索引冲突使整个分块失败
// ==========================================

use crate::db::{configure_sqlite_connection, open_sqlite_connection, rebar_bucket_column};
use crate::domain::delivery::{CanonicalRecord, ExistingDelivery, KeySource};
use crate::domain::types::{Material, REBAR_DIAMETERS_MM};
use crate::repository::delivery_store::DeliveryStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex};
use tracing::debug;

fn key_source_str(source: KeySource) -> &'static str {
    match source {
        KeySource::Natural => "NATURAL",
        KeySource::Synthetic => "SYNTHETIC",
    }
}

fn opt_text(value: &Option<String>) -> Value {
    match value {
        Some(v) => Value::Text(v.clone()),
        None => Value::Null,
    }
}

// ==========================================
// SqliteDeliveryStore
// ==========================================
pub struct SqliteDeliveryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDeliveryStore {
    /// 创建新的 Store 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（表需已由 db::init_delivery_schema 创建）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（会再次应用统一 PRAGMA，幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn material_of(table: &str) -> RepositoryResult<Material> {
        [Material::Concrete, Material::Rebar, Material::Mesh]
            .into_iter()
            .find(|m| m.table_name() == table)
            .ok_or_else(|| RepositoryError::UnknownTable(table.to_string()))
    }

    /// INSERT 语句与参数
    fn insert_statement(material: Material) -> String {
        let (columns, count) = match material {
            Material::Concrete => (
                "concrete_class, delivery_method, quantity_m3, location_block, notes".to_string(),
                5,
            ),
            Material::Rebar => {
                let buckets: Vec<String> = REBAR_DIAMETERS_MM
                    .iter()
                    .map(|d| rebar_bucket_column(*d))
                    .collect();
                (
                    format!(
                        "project_stage, manufacturer, {}, total_weight_kg, notes",
                        buckets.join(", ")
                    ),
                    REBAR_DIAMETERS_MM.len() + 4,
                )
            }
            Material::Mesh => (
                "mesh_type, dimensions, piece_count, weight_kg, usage_location, notes".to_string(),
                6,
            ),
        };

        let total = 6 + count;
        let placeholders: Vec<String> = (1..=total).map(|i| format!("?{}", i)).collect();

        format!(
            "INSERT INTO {} (date, supplier, waybill_no, key_source, supplier_key, waybill_key, {}) VALUES ({})",
            material.table_name(),
            columns,
            placeholders.join(", ")
        )
    }

    fn record_values(record: &CanonicalRecord) -> Vec<Value> {
        let key = record.dedup_key();
        let mut values = vec![
            Value::Text(key.date.clone()),
            Value::Text(record.supplier().to_string()),
            Value::Text(record.waybill_no().to_string()),
            Value::Text(key_source_str(record.key_source()).to_string()),
            Value::Text(key.supplier),
            Value::Text(key.waybill),
        ];

        match record {
            CanonicalRecord::Concrete(r) => {
                values.push(Value::Text(r.concrete_class.to_string()));
                values.push(Value::Text(r.delivery_method.to_string()));
                values.push(Value::Real(r.quantity_m3));
                values.push(Value::Text(r.location_block.clone()));
                values.push(opt_text(&r.notes));
            }
            CanonicalRecord::Rebar(r) => {
                values.push(opt_text(&r.project_stage));
                values.push(opt_text(&r.manufacturer));
                values.extend(r.weights.iter().map(|(_, kg)| Value::Real(kg)));
                values.push(Value::Real(r.total_weight_kg()));
                values.push(opt_text(&r.notes));
            }
            CanonicalRecord::Mesh(r) => {
                values.push(Value::Text(r.mesh_type.to_string()));
                values.push(opt_text(&r.dimensions));
                values.push(Value::Integer(i64::from(r.piece_count)));
                values.push(Value::Real(r.weight_kg));
                values.push(opt_text(&r.usage_location));
                values.push(opt_text(&r.notes));
            }
        }

        values
    }

    /// 表内记录数（测试与诊断用）
    pub fn count_rows(&self, table: &str) -> RepositoryResult<usize> {
        Self::material_of(table)?;
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

#[async_trait]
impl DeliveryStore for SqliteDeliveryStore {
    async fn fetch_existing(
        &self,
        table: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
        page: usize,
        page_size: usize,
    ) -> RepositoryResult<Vec<ExistingDelivery>> {
        Self::material_of(table)?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let sql = format!(
            "SELECT date, supplier, waybill_no FROM {} WHERE date >= ?1 AND date <= ?2 ORDER BY date, id LIMIT ?3 OFFSET ?4",
            table
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(
            params![
                date_from.format("%Y-%m-%d").to_string(),
                // 远端日期可能带时间部分
                format!("{} 23:59:59", date_to.format("%Y-%m-%d")),
                page_size as i64,
                (page * page_size) as i64,
            ],
            |row| {
                Ok(ExistingDelivery {
                    date: row.get(0)?,
                    supplier: row.get(1)?,
                    waybill_no: row.get(2)?,
                })
            },
        )?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }

        debug!(table, page, fetched = result.len(), "读取远端已有记录");
        Ok(result)
    }

    async fn insert_batch(&self, table: &str, records: &[CanonicalRecord]) -> RepositoryResult<usize> {
        let material = Self::material_of(table)?;

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(&Self::insert_statement(material))?;
            for record in records {
                if record.material() != material {
                    return Err(RepositoryError::MaterialMismatch {
                        table: table.to_string(),
                        material: record.material().to_string(),
                    });
                }
                stmt.execute(params_from_iter(Self::record_values(record)))?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(count)
    }
}
