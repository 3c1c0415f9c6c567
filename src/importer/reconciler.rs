// ==========================================
// 工地材料进场导入 - 远端对账器
// ==========================================
// 职责: 读取批次日期区间内的远端记录，剔除已存在的去重主键
// 红线: 远端读取失败直接返回错误（无已有主键时无法保证不重复）
// ==========================================

use crate::domain::delivery::{CanonicalRecord, DedupKey};
use crate::domain::types::Material;
use crate::importer::paged_fetch::PagedFetcher;
use crate::repository::delivery_store::DeliveryStore;
use crate::repository::error::RepositoryResult;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub survivors: Vec<CanonicalRecord>,
    pub skipped_duplicate: usize,  // 远端已存在
    pub duplicate_in_batch: usize, // 批次内重复（后出现者丢弃）
}

/// 批次内去重（保序，保留首次出现者）
///
/// # 返回
/// - (保留记录, 丢弃条数)
pub fn drop_batch_duplicates(records: Vec<CanonicalRecord>) -> (Vec<CanonicalRecord>, usize) {
    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(records.len());
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        if seen.insert(record.dedup_key()) {
            kept.push(record);
        } else {
            debug!(row = record.source_row(), waybill = record.waybill_no(), "批次内重复，丢弃");
            dropped += 1;
        }
    }

    (kept, dropped)
}

pub struct RemoteReconciler<'a, S: DeliveryStore + ?Sized> {
    fetcher: PagedFetcher<'a, S>,
}

impl<'a, S: DeliveryStore + ?Sized> RemoteReconciler<'a, S> {
    pub fn new(store: &'a S, page_size: usize, max_pages: usize) -> Self {
        Self {
            fetcher: PagedFetcher::new(store, page_size, max_pages),
        }
    }

    /// 对账
    ///
    /// # 流程
    /// 1. 计算批次最小/最大日期
    /// 2. 分页读取区间内远端记录，构建主键集合
    /// 3. 按序遍历：远端已有 → skipped_duplicate；批次内已见 → duplicate_in_batch；否则保留
    pub async fn reconcile(
        &self,
        material: Material,
        records: Vec<CanonicalRecord>,
    ) -> RepositoryResult<ReconcileOutcome> {
        let (Some(date_from), Some(date_to)) = (
            records.iter().map(|r| r.date()).min(),
            records.iter().map(|r| r.date()).max(),
        ) else {
            return Ok(ReconcileOutcome::default());
        };

        let existing = self
            .fetcher
            .fetch_all(material.table_name(), date_from, date_to)
            .await?;

        let remote_keys: HashSet<DedupKey> = existing.iter().map(|e| e.dedup_key()).collect();

        let mut outcome = ReconcileOutcome::default();
        let mut seen: HashSet<DedupKey> = HashSet::new();

        for record in records {
            let key = record.dedup_key();
            if remote_keys.contains(&key) {
                outcome.skipped_duplicate += 1;
            } else if !seen.insert(key) {
                outcome.duplicate_in_batch += 1;
            } else {
                outcome.survivors.push(record);
            }
        }

        info!(
            material = %material,
            %date_from,
            %date_to,
            remote = remote_keys.len(),
            survivors = outcome.survivors.len(),
            skipped_duplicate = outcome.skipped_duplicate,
            "远端对账完成"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::{ConcreteDelivery, ExistingDelivery, KeySource};
    use crate::domain::types::{ConcreteClass, DeliveryMethod};
    use crate::repository::error::RepositoryError;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn record(day: u32, supplier: &str, waybill: &str, row: usize) -> CanonicalRecord {
        CanonicalRecord::Concrete(ConcreteDelivery {
            date: NaiveDate::from_ymd_opt(2023, 11, day).unwrap(),
            supplier: supplier.to_string(),
            waybill_no: waybill.to_string(),
            key_source: KeySource::Natural,
            concrete_class: ConcreteClass::C25,
            delivery_method: DeliveryMethod::Mixer,
            quantity_m3: 7.0,
            location_block: "A".to_string(),
            notes: None,
            source_row: row,
        })
    }

    struct RemoteRows(Vec<ExistingDelivery>);

    #[async_trait]
    impl DeliveryStore for RemoteRows {
        async fn fetch_existing(
            &self,
            _table: &str,
            _date_from: NaiveDate,
            _date_to: NaiveDate,
            page: usize,
            _page_size: usize,
        ) -> RepositoryResult<Vec<ExistingDelivery>> {
            Ok(if page == 0 { self.0.clone() } else { Vec::new() })
        }

        async fn insert_batch(&self, _table: &str, records: &[CanonicalRecord]) -> RepositoryResult<usize> {
            Ok(records.len())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl DeliveryStore for BrokenStore {
        async fn fetch_existing(
            &self,
            _table: &str,
            _date_from: NaiveDate,
            _date_to: NaiveDate,
            _page: usize,
            _page_size: usize,
        ) -> RepositoryResult<Vec<ExistingDelivery>> {
            Err(RepositoryError::DatabaseConnectionError("offline".to_string()))
        }

        async fn insert_batch(&self, _table: &str, _records: &[CanonicalRecord]) -> RepositoryResult<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_drop_batch_duplicates_keeps_first() {
        let (kept, dropped) = drop_batch_duplicates(vec![
            record(24, "A", "1", 2),
            record(24, "a ", " 1", 3),
            record(24, "A", "2", 4),
        ]);
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].source_row(), 2);
    }

    #[tokio::test]
    async fn test_remote_keys_normalized() {
        let store = RemoteRows(vec![ExistingDelivery {
            date: "2023-11-24T00:00:00+00:00".to_string(),
            supplier: Some("albayrak".to_string()),
            waybill_no: Some("100 ".to_string()),
        }]);

        let outcome = RemoteReconciler::new(&store, 1000, 10)
            .reconcile(
                Material::Concrete,
                vec![record(24, "ALBAYRAK", "100", 2), record(25, "ALBAYRAK", "100", 3)],
            )
            .await
            .unwrap();

        assert_eq!(outcome.skipped_duplicate, 1);
        assert_eq!(outcome.survivors.len(), 1);
        assert_eq!(outcome.survivors[0].source_row(), 3);
    }

    #[tokio::test]
    async fn test_fetch_error_is_fatal() {
        let result = RemoteReconciler::new(&BrokenStore, 1000, 10)
            .reconcile(Material::Concrete, vec![record(24, "A", "1", 2)])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_fetch() {
        let outcome = RemoteReconciler::new(&BrokenStore, 1000, 10)
            .reconcile(Material::Concrete, Vec::new())
            .await
            .unwrap();
        assert!(outcome.survivors.is_empty());
    }
}
