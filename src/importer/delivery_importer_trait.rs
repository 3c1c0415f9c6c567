// ==========================================
// 工地材料进场导入 - 导入接口 Trait
// ==========================================
// 职责: 定义导入主接口与表格读取接口（不包含实现）
// ==========================================

use crate::domain::import_report::{ImportReport, PreparedBatch};
use crate::domain::raw_table::RawTable;
use crate::domain::types::Material;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// DeliveryImporter Trait
// ==========================================
// 用途: 进场记录导入主接口
// 实现者: DeliveryImporterImpl
#[async_trait]
pub trait DeliveryImporter: Send + Sync {
    /// 解析单个工作表并完成行分类（不访问远端）
    ///
    /// # 参数
    /// - file_path: 表格文件路径（.xlsx/.xls/.xlsb/.ods/.csv）
    /// - sheet: 工作表名，None 表示第一个工作表
    /// - material: 材料类别
    ///
    /// # 返回
    /// - Ok(PreparedBatch): 待提交记录 + 行级错误
    /// - Err: 文件错误 / HeaderNotFound / MissingMandatoryColumn
    async fn prepare_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        sheet: Option<&str>,
        material: Material,
    ) -> ImportResult<PreparedBatch>;

    /// 解析工作簿的全部工作表并合并
    ///
    /// # 说明
    /// - 非数据表（表头未找到 / 必填列缺失）记入 sheet_failures 后跳过
    /// - 合并时跨表重复同样计入 duplicate_in_batch
    async fn prepare_workbook<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        material: Material,
    ) -> ImportResult<PreparedBatch>;

    /// 与远端对账后分块写入
    ///
    /// # 返回
    /// - Ok(ImportReport): 分块失败不会返回 Err，只记入报告
    /// - Err(ImportError::Store): 读取远端已有记录失败
    async fn commit(&self, prepared: PreparedBatch) -> ImportResult<ImportReport>;

    /// prepare_file + commit
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        sheet: Option<&str>,
        material: Material,
    ) -> ImportResult<ImportReport>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 表格读取接口
// 实现者: ExcelParser, CsvParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 列出工作表名（CSV 只有一张表，名为文件名）
    fn sheet_names(&self, file_path: &Path) -> ImportResult<Vec<String>>;

    /// 读取工作表为原始二维表
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - sheet: 工作表名，None 表示第一个
    ///
    /// # 返回
    /// - Ok(RawTable): 首行作为临时列名，其余为数据行（保留空行）
    /// - Err: 文件不存在 / 格式不支持 / 解析失败 / 工作表不存在
    fn read_sheet(&self, file_path: &Path, sheet: Option<&str>) -> ImportResult<RawTable>;
}
