// ==========================================
// 工地材料进场导入 - 分块写入器
// ==========================================
// 职责: 对账后的记录按 chunk_size 分块追加到远端
// 红线: 单个分块失败只记入报告，继续后续分块（无跨分块事务）
// ==========================================

use crate::domain::delivery::CanonicalRecord;
use crate::domain::import_report::ChunkFailure;
use crate::repository::delivery_store::DeliveryStore;
use tracing::{debug, error};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOutcome {
    pub accepted: usize,
    pub failed: usize,
    pub chunk_failures: Vec<ChunkFailure>,
}

pub struct BatchUploader<'a, S: DeliveryStore + ?Sized> {
    store: &'a S,
    chunk_size: usize,
}

impl<'a, S: DeliveryStore + ?Sized> BatchUploader<'a, S> {
    pub fn new(store: &'a S, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    pub async fn upload(&self, table: &str, records: &[CanonicalRecord]) -> UploadOutcome {
        let mut outcome = UploadOutcome::default();

        for (chunk_index, chunk) in records.chunks(self.chunk_size).enumerate() {
            match self.store.insert_batch(table, chunk).await {
                Ok(inserted) => {
                    debug!(table, chunk_index, inserted, "分块写入成功");
                    outcome.accepted += inserted;
                }
                Err(e) => {
                    error!(table, chunk_index, size = chunk.len(), error = %e, "分块写入失败");
                    outcome.failed += chunk.len();
                    outcome.chunk_failures.push(ChunkFailure {
                        chunk_index,
                        size: chunk.len(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::{ConcreteDelivery, ExistingDelivery, KeySource};
    use crate::domain::types::{ConcreteClass, DeliveryMethod};
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // 第 fail_on 次调用失败
    struct FlakyStore {
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryStore for FlakyStore {
        async fn fetch_existing(
            &self,
            _table: &str,
            _date_from: NaiveDate,
            _date_to: NaiveDate,
            _page: usize,
            _page_size: usize,
        ) -> RepositoryResult<Vec<ExistingDelivery>> {
            Ok(Vec::new())
        }

        async fn insert_batch(&self, _table: &str, records: &[CanonicalRecord]) -> RepositoryResult<usize> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on {
                Err(RepositoryError::UniqueConstraintViolation("uq_concrete_logs_dedup".to_string()))
            } else {
                Ok(records.len())
            }
        }
    }

    fn records(n: usize) -> Vec<CanonicalRecord> {
        (0..n)
            .map(|i| {
                CanonicalRecord::Concrete(ConcreteDelivery {
                    date: NaiveDate::from_ymd_opt(2023, 11, 24).unwrap(),
                    supplier: "A".to_string(),
                    waybill_no: i.to_string(),
                    key_source: KeySource::Natural,
                    concrete_class: ConcreteClass::C30,
                    delivery_method: DeliveryMethod::Mixer,
                    quantity_m3: 1.0,
                    location_block: "A".to_string(),
                    notes: None,
                    source_row: i + 2,
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_abort() {
        let store = FlakyStore { fail_on: 1, calls: AtomicUsize::new(0) };
        let outcome = BatchUploader::new(&store, 2).upload("concrete_logs", &records(5)).await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.accepted, 3);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.chunk_failures.len(), 1);
        assert_eq!(outcome.chunk_failures[0].chunk_index, 1);
        assert_eq!(outcome.chunk_failures[0].size, 2);
    }

    #[tokio::test]
    async fn test_empty_input_no_calls() {
        let store = FlakyStore { fail_on: 0, calls: AtomicUsize::new(0) };
        let outcome = BatchUploader::new(&store, 500).upload("concrete_logs", &[]).await;

        assert_eq!(outcome, UploadOutcome::default());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }
}
