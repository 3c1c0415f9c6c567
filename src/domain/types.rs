// ==========================================
// 工地材料进场导入 - 领域类型定义
// ==========================================
// 职责: 材料类别 + 各类封闭枚举（混凝土等级 / 浇筑方式 / 钢筋网型号 / 钢筋直径）
// 红线: 无法识别的自由文本一律落到 Other / 默认值，不因枚举不匹配而拒收
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 材料类别 (Material)
// ==========================================
// 每个类别对应远端一张表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Material {
    Concrete, // 混凝土（BETON）
    Rebar,    // 钢筋（DEMİR）
    Mesh,     // 钢筋网（HASIR）
}

impl Material {
    /// 远端表名
    pub fn table_name(&self) -> &'static str {
        match self {
            Material::Concrete => "concrete_logs",
            Material::Rebar => "rebar_logs",
            Material::Mesh => "mesh_logs",
        }
    }

    /// 表头识别关键字（已做变音折叠 + 大写）
    pub fn header_keywords(&self) -> &'static [&'static str] {
        match self {
            Material::Concrete => &[
                "TARIH", "DATE", "FIRMA", "SUPPLIER", "BETON", "CONCRETE", "SINIF", "CLASS",
                "MIKTAR", "QUANTITY", "IRSALIYE", "WAYBILL",
            ],
            Material::Rebar => &[
                "TARIH", "DATE", "FIRMA", "TEDARIK", "SUPPLIER", "IRSALIYE", "WAYBILL", "ETAP",
                "STAGE", "URETICI", "MANUFACTURER", "LIK", "LUK",
            ],
            Material::Mesh => &[
                "TARIH", "DATE", "FIRMA", "SUPPLIER", "IRSALIYE", "WAYBILL", "HASIR", "MESH",
                "TIP", "TYPE", "ADET", "PIECE", "AGIRLIK", "WEIGHT", "EBAT", "OLCU",
            ],
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Material::Concrete => write!(f, "CONCRETE"),
            Material::Rebar => write!(f, "REBAR"),
            Material::Mesh => write!(f, "MESH"),
        }
    }
}

// ==========================================
// 混凝土等级 (Concrete Class)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcreteClass {
    C16,
    C20,
    C25,
    C30,
    C35,
    C40,
    C45,
    C50,
    Gro,   // 垫层混凝土（GROBETON）
    Sap,   // 找平砂浆（ŞAP）
    Other, // 无法识别
}

impl ConcreteClass {
    /// 标准化源文本
    ///
    /// # 规则
    /// - 去空格 + 大写后按前缀匹配：`C 30/37` → C30
    /// - GRO* → Gro，SAP/ŞAP → Sap
    /// - 其他 → Other
    pub fn normalize(raw: &str) -> Self {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase()
            .replace('Ş', "S");

        if compact.starts_with("GRO") {
            return ConcreteClass::Gro;
        }
        if compact.starts_with("SAP") {
            return ConcreteClass::Sap;
        }

        // 取 C 之后的首段数字
        let strength: String = compact
            .strip_prefix('C')
            .unwrap_or("")
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();

        match strength.as_str() {
            "16" => ConcreteClass::C16,
            "20" => ConcreteClass::C20,
            "25" => ConcreteClass::C25,
            "30" => ConcreteClass::C30,
            "35" => ConcreteClass::C35,
            "40" => ConcreteClass::C40,
            "45" => ConcreteClass::C45,
            "50" => ConcreteClass::C50,
            _ => ConcreteClass::Other,
        }
    }
}

impl fmt::Display for ConcreteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcreteClass::C16 => write!(f, "C16"),
            ConcreteClass::C20 => write!(f, "C20"),
            ConcreteClass::C25 => write!(f, "C25"),
            ConcreteClass::C30 => write!(f, "C30"),
            ConcreteClass::C35 => write!(f, "C35"),
            ConcreteClass::C40 => write!(f, "C40"),
            ConcreteClass::C45 => write!(f, "C45"),
            ConcreteClass::C50 => write!(f, "C50"),
            ConcreteClass::Gro => write!(f, "GRO"),
            ConcreteClass::Sap => write!(f, "ŞAP"),
            ConcreteClass::Other => write!(f, "OTHER"),
        }
    }
}

// ==========================================
// 浇筑方式 (Delivery Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    Pumped, // 泵送（POMPALI）
    Mixer,  // 罐车直卸（MİKSERLİ）
}

impl DeliveryMethod {
    /// 含 POMPA / PUMP → Pumped，其余（含空值）→ Mixer
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some(v) => {
                let upper = v.to_uppercase();
                if upper.contains("POMPA") || upper.contains("PUMP") {
                    DeliveryMethod::Pumped
                } else {
                    DeliveryMethod::Mixer
                }
            }
            None => DeliveryMethod::Mixer,
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMethod::Pumped => write!(f, "PUMPED"),
            DeliveryMethod::Mixer => write!(f, "MIXER"),
        }
    }
}

// ==========================================
// 钢筋网型号 (Mesh Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshType {
    Q,
    R,
    Tr,
    Other,
}

impl MeshType {
    /// 按前缀归类：Q131 → Q，R257 → R，T* → TR
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        if upper.starts_with('Q') {
            MeshType::Q
        } else if upper.starts_with('R') {
            MeshType::R
        } else if upper.starts_with('T') {
            MeshType::Tr
        } else {
            MeshType::Other
        }
    }

    /// 源文本是否恰好就是标准型号（否则需在备注中保留原文）
    pub fn is_exact(raw: &str) -> bool {
        matches!(raw.trim().to_uppercase().as_str(), "Q" | "R" | "TR")
    }
}

impl fmt::Display for MeshType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshType::Q => write!(f, "Q"),
            MeshType::R => write!(f, "R"),
            MeshType::Tr => write!(f, "TR"),
            MeshType::Other => write!(f, "OTHER"),
        }
    }
}

// ==========================================
// 钢筋直径分档 (Diameter Class)
// ==========================================
// 固定有序集合（mm）
pub const REBAR_DIAMETERS_MM: [u32; 11] = [8, 10, 12, 14, 16, 18, 20, 22, 25, 28, 32];

/// 无标准分档、并入 25mm 的直径
pub const FOLDED_DIAMETER_MM: u32 = 24;

/// 并入目标分档
pub const FOLD_TARGET_DIAMETER_MM: u32 = 25;

/// 按直径分档的重量（kg），下标与 REBAR_DIAMETERS_MM 一致
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiameterWeights {
    kg: [f64; REBAR_DIAMETERS_MM.len()],
}

impl DiameterWeights {
    fn index_of(diameter_mm: u32) -> Option<usize> {
        REBAR_DIAMETERS_MM.iter().position(|d| *d == diameter_mm)
    }

    /// 读取某分档重量（非标准直径返回 None）
    pub fn get(&self, diameter_mm: u32) -> Option<f64> {
        Self::index_of(diameter_mm).map(|i| self.kg[i])
    }

    /// 累加某分档重量，非标准直径返回 false
    pub fn add(&mut self, diameter_mm: u32, kg: f64) -> bool {
        match Self::index_of(diameter_mm) {
            Some(i) => {
                self.kg[i] += kg;
                true
            }
            None => false,
        }
    }

    /// 按直径升序遍历 (直径, 重量)
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        REBAR_DIAMETERS_MM.iter().copied().zip(self.kg.iter().copied())
    }

    /// 各分档合计
    pub fn total(&self) -> f64 {
        self.kg.iter().sum()
    }
}
