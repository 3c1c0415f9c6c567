// ==========================================
// 工地材料进场导入 - 导入器实现
// ==========================================
// 职责: 整合导入流程，从表格文件到远端日志表
// 流程: 读表 → 表头定位 → 列映射 → 行分类 → 合成主键 → 批次内去重 → 远端对账 → 分块写入
// 红线: 行级问题只进报告；远端读取失败中断提交；分块失败不中断
// ==========================================

use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::import_report::{ImportReport, PreparedBatch, SheetFailure};
use crate::domain::raw_table::RawTable;
use crate::domain::types::Material;
use crate::importer::batch_uploader::BatchUploader;
use crate::importer::delivery_importer_trait::{DeliveryImporter, FileParser};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::ColumnMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::header_locator::HeaderLocator;
use crate::importer::reconciler::{drop_batch_duplicates, RemoteReconciler};
use crate::importer::row_classifier::{RowClassifier, RowOutcome};
use crate::importer::surrogate_key::SurrogateKeyGenerator;
use crate::repository::delivery_store::DeliveryStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 单个原始表的解析 + 分类（纯内存，不访问远端）
///
/// # 流程
/// 1. 定位表头（首行不是表头时向下扫描）
/// 2. 按材料策略映射列（必填列缺失 → Err）
/// 3. 逐行分类：通过 → 补合成主键；跳过 → 计数；错误 → 进入 errors
/// 4. 批次内去重（保留首次出现者）
pub fn prepare_table(
    table: RawTable,
    material: Material,
    settings: &ImportSettings,
) -> ImportResult<PreparedBatch> {
    let sheet_name = table.sheet_name.clone();

    let locator = HeaderLocator::new(settings.header_scan_rows, settings.header_min_matches);
    let table = locator.locate(table, material.header_keywords())?;

    let mapper = ColumnMapper::for_material(material)?;
    let field_map = mapper.map(&sheet_name, &table.labels)?;

    let classifier = RowClassifier::new(material, &field_map, settings);
    let mut batch = PreparedBatch::empty(material);
    batch.sheet_names.push(sheet_name.clone());

    let mut accepted = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        batch.total_rows += 1;
        match classifier.classify(row) {
            RowOutcome::Accepted(mut record) => {
                SurrogateKeyGenerator::assign(&mut record);
                accepted.push(record);
            }
            RowOutcome::Skipped(reason) => {
                debug!(row = row.row_number, ?reason, "跳过行");
                batch.skipped_rows += 1;
            }
            RowOutcome::Error(row_error) => {
                warn!(
                    row = row_error.row_number,
                    field = %row_error.field,
                    kind = %row_error.kind,
                    "行分类失败"
                );
                batch.errors.push(row_error);
            }
        }
    }

    let (records, dropped) = drop_batch_duplicates(accepted);
    batch.records = records;
    batch.duplicate_in_batch = dropped;

    info!(
        sheet = %sheet_name,
        material = %material,
        total_rows = batch.total_rows,
        records = batch.records.len(),
        errors = batch.errors.len(),
        skipped = batch.skipped_rows,
        duplicate_in_batch = batch.duplicate_in_batch,
        "工作表解析完成"
    );

    Ok(batch)
}

/// 合并多个工作表的待提交批次（跨表重复计入 duplicate_in_batch）
pub fn merge_batches(material: Material, batches: Vec<PreparedBatch>) -> PreparedBatch {
    let mut merged = PreparedBatch::empty(material);
    let mut records = Vec::new();

    for batch in batches {
        merged.sheet_names.extend(batch.sheet_names);
        merged.total_rows += batch.total_rows;
        merged.skipped_rows += batch.skipped_rows;
        merged.duplicate_in_batch += batch.duplicate_in_batch;
        merged.errors.extend(batch.errors);
        merged.sheet_failures.extend(batch.sheet_failures);
        records.extend(batch.records);
    }

    let (records, cross_sheet) = drop_batch_duplicates(records);
    merged.records = records;
    merged.duplicate_in_batch += cross_sheet;
    merged
}

// ==========================================
// DeliveryImporterImpl - 导入器实现
// ==========================================
pub struct DeliveryImporterImpl<S, C>
where
    S: DeliveryStore,
    C: ImportConfigReader,
{
    // 远端存储（调用方构造后传入）
    store: Arc<S>,

    // 配置读取器
    config: C,

    // 表格读取
    file_parser: Box<dyn FileParser>,
}

impl<S, C> DeliveryImporterImpl<S, C>
where
    S: DeliveryStore,
    C: ImportConfigReader,
{
    /// 创建导入器（按扩展名自动选择读取器）
    pub fn new(store: Arc<S>, config: C) -> Self {
        Self::with_parser(store, config, Box::new(UniversalFileParser))
    }

    /// 创建导入器并指定表格读取器
    pub fn with_parser(store: Arc<S>, config: C, file_parser: Box<dyn FileParser>) -> Self {
        Self {
            store,
            config,
            file_parser,
        }
    }

    async fn settings(&self) -> ImportResult<ImportSettings> {
        ImportSettings::load(&self.config).await
    }
}

#[async_trait]
impl<S, C> DeliveryImporter for DeliveryImporterImpl<S, C>
where
    S: DeliveryStore,
    C: ImportConfigReader,
{
    #[instrument(skip(self, file_path))]
    async fn prepare_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        sheet: Option<&str>,
        material: Material,
    ) -> ImportResult<PreparedBatch> {
        let settings = self.settings().await?;
        let path = file_path.as_ref();
        info!(file = %path.display(), sheet = ?sheet, "开始解析进场表");

        let table = self.file_parser.read_sheet(path, sheet)?;
        prepare_table(table, material, &settings)
    }

    #[instrument(skip(self, file_path))]
    async fn prepare_workbook<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        material: Material,
    ) -> ImportResult<PreparedBatch> {
        let settings = self.settings().await?;
        let path = file_path.as_ref();
        let sheet_names = self.file_parser.sheet_names(path)?;
        info!(file = %path.display(), sheets = sheet_names.len(), "开始解析工作簿");

        let mut batches = Vec::with_capacity(sheet_names.len());
        let mut failures = Vec::new();

        for name in &sheet_names {
            let table = self.file_parser.read_sheet(path, Some(name))?;
            match prepare_table(table, material, &settings) {
                Ok(batch) => batches.push(batch),
                Err(e) if e.is_sheet_scoped() => {
                    warn!(sheet = %name, error = %e, "非数据表，跳过");
                    failures.push(SheetFailure {
                        sheet_name: name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let mut merged = merge_batches(material, batches);
        merged.sheet_failures.extend(failures);

        info!(
            sheets = merged.sheet_names.len(),
            failed_sheets = merged.sheet_failures.len(),
            records = merged.records.len(),
            duplicate_in_batch = merged.duplicate_in_batch,
            "工作簿解析完成"
        );
        Ok(merged)
    }

    #[instrument(skip(self, prepared), fields(material = %prepared.material, batch_id))]
    async fn commit(&self, prepared: PreparedBatch) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let settings = self.settings().await?;
        let material = prepared.material;
        info!(batch_id = %batch_id, records = prepared.records.len(), "开始提交批次");

        // === 步骤 1: 远端对账 ===
        let reconciler =
            RemoteReconciler::new(self.store.as_ref(), settings.page_size, settings.max_pages);
        let reconciled = reconciler.reconcile(material, prepared.records).await?;

        // === 步骤 2: 分块写入 ===
        let uploader = BatchUploader::new(self.store.as_ref(), settings.chunk_size);
        let uploaded = uploader
            .upload(material.table_name(), &reconciled.survivors)
            .await;

        let report = ImportReport {
            batch_id,
            material,
            total_rows: prepared.total_rows,
            accepted: uploaded.accepted,
            skipped_duplicate: reconciled.skipped_duplicate,
            duplicate_in_batch: prepared.duplicate_in_batch + reconciled.duplicate_in_batch,
            skipped_rows: prepared.skipped_rows,
            failed: uploaded.failed,
            errors: prepared.errors,
            chunk_failures: uploaded.chunk_failures,
            sheet_failures: prepared.sheet_failures,
            elapsed_ms: start_time.elapsed().as_millis(),
        };

        info!(
            batch_id = %report.batch_id,
            accepted = report.accepted,
            skipped_duplicate = report.skipped_duplicate,
            duplicate_in_batch = report.duplicate_in_batch,
            failed = report.failed,
            errors = report.errors.len(),
            elapsed_ms = report.elapsed_ms as u64,
            "批次提交完成"
        );

        Ok(report)
    }

    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        sheet: Option<&str>,
        material: Material,
    ) -> ImportResult<ImportReport> {
        let prepared = self.prepare_file(file_path, sheet, material).await?;
        self.commit(prepared).await
    }
}
