// ==========================================
// 工地材料进场导入 - 进场记录领域模型
// ==========================================
// 用途: 行分类通过后的标准化记录（与源表格列名无关）
// 红线: 三类材料各自强类型，不使用开放式 key-value 结构
// 红线: 钢筋合计重量只由直径分档推导，不单独存储
// ==========================================

use crate::domain::types::{
    ConcreteClass, DeliveryMethod, DiameterWeights, Material, MeshType,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// KeySource - 运单号来源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeySource {
    Natural,   // 源表格中的运单号
    Synthetic, // 运单号缺失，由内容哈希合成
}

// ==========================================
// ConcreteDelivery - 混凝土进场
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteDelivery {
    pub date: NaiveDate,
    pub supplier: String,                // 已 TRIM + UPPER
    pub waybill_no: String,              // 运单号或合成主键
    pub key_source: KeySource,
    pub concrete_class: ConcreteClass,
    pub delivery_method: DeliveryMethod,
    pub quantity_m3: f64,                // > 0
    pub location_block: String,          // 默认 "Unknown"
    pub notes: Option<String>,
    #[serde(skip)]
    pub source_row: usize,               // 源表格行号
}

// ==========================================
// RebarDelivery - 钢筋进场
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebarDelivery {
    pub date: NaiveDate,
    pub supplier: String,
    pub waybill_no: String,
    pub key_source: KeySource,
    pub project_stage: Option<String>,   // 施工阶段（ETAP）
    pub manufacturer: Option<String>,    // 生产厂（ÜRETİCİ）
    pub weights: DiameterWeights,        // 各直径分档重量（kg）
    pub notes: Option<String>,
    #[serde(skip)]
    pub source_row: usize,
}

impl RebarDelivery {
    /// 合计重量（= 各分档之和）
    pub fn total_weight_kg(&self) -> f64 {
        self.weights.total()
    }
}

// ==========================================
// MeshDelivery - 钢筋网进场
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDelivery {
    pub date: NaiveDate,
    pub supplier: String,
    pub waybill_no: String,
    pub key_source: KeySource,
    pub mesh_type: MeshType,
    pub dimensions: Option<String>,
    pub piece_count: u32,
    pub weight_kg: f64,                  // piece_count = 0 时必须 > 0
    pub usage_location: Option<String>,
    pub notes: Option<String>,
    #[serde(skip)]
    pub source_row: usize,
}

// ==========================================
// CanonicalRecord - 标准化进场记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "material", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalRecord {
    Concrete(ConcreteDelivery),
    Rebar(RebarDelivery),
    Mesh(MeshDelivery),
}

impl CanonicalRecord {
    pub fn material(&self) -> Material {
        match self {
            CanonicalRecord::Concrete(_) => Material::Concrete,
            CanonicalRecord::Rebar(_) => Material::Rebar,
            CanonicalRecord::Mesh(_) => Material::Mesh,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            CanonicalRecord::Concrete(r) => r.date,
            CanonicalRecord::Rebar(r) => r.date,
            CanonicalRecord::Mesh(r) => r.date,
        }
    }

    pub fn supplier(&self) -> &str {
        match self {
            CanonicalRecord::Concrete(r) => &r.supplier,
            CanonicalRecord::Rebar(r) => &r.supplier,
            CanonicalRecord::Mesh(r) => &r.supplier,
        }
    }

    pub fn waybill_no(&self) -> &str {
        match self {
            CanonicalRecord::Concrete(r) => &r.waybill_no,
            CanonicalRecord::Rebar(r) => &r.waybill_no,
            CanonicalRecord::Mesh(r) => &r.waybill_no,
        }
    }

    pub fn key_source(&self) -> KeySource {
        match self {
            CanonicalRecord::Concrete(r) => r.key_source,
            CanonicalRecord::Rebar(r) => r.key_source,
            CanonicalRecord::Mesh(r) => r.key_source,
        }
    }

    pub fn source_row(&self) -> usize {
        match self {
            CanonicalRecord::Concrete(r) => r.source_row,
            CanonicalRecord::Rebar(r) => r.source_row,
            CanonicalRecord::Mesh(r) => r.source_row,
        }
    }

    /// 写入运单号（自然值或合成主键）
    pub fn set_waybill(&mut self, waybill_no: String, key_source: KeySource) {
        let (slot, source) = match self {
            CanonicalRecord::Concrete(r) => (&mut r.waybill_no, &mut r.key_source),
            CanonicalRecord::Rebar(r) => (&mut r.waybill_no, &mut r.key_source),
            CanonicalRecord::Mesh(r) => (&mut r.waybill_no, &mut r.key_source),
        };
        *slot = waybill_no;
        *source = key_source;
    }

    /// 去重主键
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(
            &self.date().format("%Y-%m-%d").to_string(),
            self.supplier(),
            self.waybill_no(),
        )
    }
}

// ==========================================
// DedupKey - 去重主键
// ==========================================
// (日期, 供应商, 运单号)，三段均已标准化
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupKey {
    pub date: String,
    pub supplier: String,
    pub waybill: String,
}

impl DedupKey {
    /// 构造并标准化
    ///
    /// # 规则
    /// - date: 截取前 10 位（"2023-11-24T00:00:00" → "2023-11-24"）
    /// - supplier / waybill: TRIM + UPPER + 连续空白合并为单个空格
    pub fn new(date: &str, supplier: &str, waybill: &str) -> Self {
        let date = date.trim();
        let date = date.get(..10).unwrap_or(date).to_string();
        Self {
            date,
            supplier: normalize_key_part(supplier),
            waybill: normalize_key_part(waybill),
        }
    }
}

/// 去重主键文本段标准化
pub fn normalize_key_part(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

// ==========================================
// ExistingDelivery - 远端已有记录（去重所需最小投影）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingDelivery {
    pub date: String,               // 远端原样日期文本（可能带时间）
    pub supplier: Option<String>,
    pub waybill_no: Option<String>,
}

impl ExistingDelivery {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(
            &self.date,
            self.supplier.as_deref().unwrap_or(""),
            self.waybill_no.as_deref().unwrap_or(""),
        )
    }
}
