// ==========================================
// 工地材料进场导入 - 导入层
// ==========================================
// 职责: 周报表格 → 标准化进场记录 → 远端日志表
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb/.ods), CSV
// ==========================================

// 模块声明
pub mod batch_uploader;
pub mod delivery_importer_impl;
pub mod delivery_importer_trait;
pub mod diameter_aggregator;
pub mod error;
pub mod field_mapper;
pub mod field_normalizer;
pub mod file_parser;
pub mod header_locator;
pub mod paged_fetch;
pub mod reconciler;
pub mod row_classifier;
pub mod surrogate_key;

// 重导出核心类型
pub use batch_uploader::{BatchUploader, UploadOutcome};
pub use delivery_importer_impl::{merge_batches, prepare_table, DeliveryImporterImpl};
pub use diameter_aggregator::{AggregatedWeights, DiameterAggregator, DiameterColumn};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{CanonicalField, ColumnMapper, ColumnPatterns, FieldMap, MappedColumn};
pub use field_normalizer::{FieldNormalizer, NormalizeError};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use header_locator::HeaderLocator;
pub use paged_fetch::PagedFetcher;
pub use reconciler::{drop_batch_duplicates, ReconcileOutcome, RemoteReconciler};
pub use row_classifier::{RowClassifier, RowOutcome};
pub use surrogate_key::SurrogateKeyGenerator;

// 重导出 Trait 接口
pub use delivery_importer_trait::{DeliveryImporter, FileParser};
