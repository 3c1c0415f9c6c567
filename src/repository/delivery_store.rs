// ==========================================
// 工地材料进场导入 - 远端存储 Trait
// ==========================================
// 职责: 定义对账与写入所需的远端表访问接口（不包含业务逻辑）
// 红线: 只有按日期区间分页读取与批量追加，没有更新/删除
// ==========================================

use crate::domain::delivery::{CanonicalRecord, ExistingDelivery};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::NaiveDate;

// ==========================================
// DeliveryStore Trait
// ==========================================
// 用途: 远端进场记录表
// 实现者: SqliteDeliveryStore
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// 分页读取日期区间内的已有记录（去重所需最小投影）
    ///
    /// # 参数
    /// - table: 目标表名（concrete_logs / rebar_logs / mesh_logs）
    /// - date_from / date_to: 闭区间
    /// - page: 页号（0 起）
    /// - page_size: 每页行数
    ///
    /// # 返回
    /// - Ok(Vec): 本页记录，少于 page_size 表示已到末页
    async fn fetch_existing(
        &self,
        table: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
        page: usize,
        page_size: usize,
    ) -> RepositoryResult<Vec<ExistingDelivery>>;

    /// 批量追加记录（单次调用即一个分块）
    ///
    /// # 返回
    /// - Ok(usize): 写入条数
    /// - Err: 整个分块失败（实现方保证分块内要么全写要么全不写）
    async fn insert_batch(&self, table: &str, records: &[CanonicalRecord]) -> RepositoryResult<usize>;
}
