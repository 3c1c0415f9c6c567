// ==========================================
// 工地材料进场导入 - 分页读取器
// ==========================================
// 职责: 远端按日期区间分页读取（页号 0 起），短页或达到最大页数时停止
// ==========================================

use crate::config::MAX_PAGE_SIZE;
use crate::domain::delivery::ExistingDelivery;
use crate::repository::delivery_store::DeliveryStore;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use tracing::{debug, warn};

pub struct PagedFetcher<'a, S: DeliveryStore + ?Sized> {
    store: &'a S,
    page_size: usize,
    max_pages: usize,
}

impl<'a, S: DeliveryStore + ?Sized> PagedFetcher<'a, S> {
    pub fn new(store: &'a S, page_size: usize, max_pages: usize) -> Self {
        Self {
            store,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            max_pages: max_pages.max(1),
        }
    }

    /// 读取区间内全部记录
    ///
    /// # 返回
    /// - Ok(Vec): 全部页拼接结果
    /// - Err: 任一页读取失败
    pub async fn fetch_all(
        &self,
        table: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> RepositoryResult<Vec<ExistingDelivery>> {
        let mut all = Vec::new();

        for page in 0..self.max_pages {
            let rows = self
                .store
                .fetch_existing(table, date_from, date_to, page, self.page_size)
                .await?;
            let fetched = rows.len();
            all.extend(rows);

            if fetched < self.page_size {
                debug!(table, pages = page + 1, total = all.len(), "分页读取完成");
                return Ok(all);
            }
        }

        warn!(
            table,
            max_pages = self.max_pages,
            total = all.len(),
            "已达到最大页数，停止读取"
        );
        Ok(all)
    }
}
