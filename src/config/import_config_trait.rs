// ==========================================
// 工地材料进场导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入流程所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入流程所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 远端对账 =====

    /// 对账分页大小
    ///
    /// # 默认值
    /// - 1000（上限 1000）
    async fn get_page_size(&self) -> ImportResult<usize>;

    /// 对账最大页数（安全上限，超出时告警并停止读取）
    ///
    /// # 默认值
    /// - 10000
    async fn get_max_pages(&self) -> ImportResult<usize>;

    // ===== 批量写入 =====

    /// 写入分块大小
    ///
    /// # 默认值
    /// - 500
    async fn get_chunk_size(&self) -> ImportResult<usize>;

    // ===== 表头定位 =====

    /// 表头扫描行数
    ///
    /// # 默认值
    /// - 20
    async fn get_header_scan_rows(&self) -> ImportResult<usize>;

    /// 表头行最少关键字命中数
    ///
    /// # 默认值
    /// - 2
    async fn get_header_min_matches(&self) -> ImportResult<usize>;

    // ===== 行分类 =====

    /// 钢筋行最小合计重量（kg），合计不超过该值视为非进场行
    ///
    /// # 默认值
    /// - 1.0
    async fn get_min_rebar_total_kg(&self) -> ImportResult<f64>;

    /// 混凝土浇筑部位缺失时的默认值
    ///
    /// # 默认值
    /// - "Unknown"
    async fn get_default_location_block(&self) -> ImportResult<String>;
}
