// ==========================================
// 工地材料进场导入 - 列映射器实现
// ==========================================
// 职责: 源列名（同义词、土耳其语/英语混用）→ 标准字段
// 规则: 每个标准字段一组有序的 include/exclude 正则，匹配变音折叠后的列名
// 红线: 一列只归属一个字段（先到先得），直径列不参与标量字段映射
// ==========================================

use crate::domain::types::Material;
use crate::importer::diameter_aggregator::{DiameterAggregator, DiameterColumn};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::fold_upper;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

// ==========================================
// CanonicalField - 标准字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Date,
    Supplier,
    Waybill,
    Notes,
    // 混凝土
    ConcreteClass,
    DeliveryMethod,
    QuantityM3,
    LocationBlock,
    // 钢筋
    ProjectStage,
    Manufacturer,
    // 钢筋网
    MeshType,
    Dimensions,
    Length,
    Width,
    PieceCount,
    WeightKg,
    WaybillWeight,
    UsageLocation,
    Section,
}

impl CanonicalField {
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Supplier => "supplier",
            CanonicalField::Waybill => "waybill_no",
            CanonicalField::Notes => "notes",
            CanonicalField::ConcreteClass => "concrete_class",
            CanonicalField::DeliveryMethod => "delivery_method",
            CanonicalField::QuantityM3 => "quantity_m3",
            CanonicalField::LocationBlock => "location_block",
            CanonicalField::ProjectStage => "project_stage",
            CanonicalField::Manufacturer => "manufacturer",
            CanonicalField::MeshType => "mesh_type",
            CanonicalField::Dimensions => "dimensions",
            CanonicalField::Length => "length",
            CanonicalField::Width => "width",
            CanonicalField::PieceCount => "piece_count",
            CanonicalField::WeightKg => "weight_kg",
            CanonicalField::WaybillWeight => "waybill_weight_kg",
            CanonicalField::UsageLocation => "usage_location",
            CanonicalField::Section => "section",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ==========================================
// ColumnPatterns - 单字段匹配策略
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnPatterns {
    pub field: CanonicalField,
    include: Vec<Regex>, // 按优先级
    exclude: Vec<Regex>,
}

impl ColumnPatterns {
    pub fn new(
        field: CanonicalField,
        include: &[&str],
        exclude: &[&str],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            field,
            include: include.iter().map(|p| Regex::new(p)).collect::<Result<_, _>>()?,
            exclude: exclude.iter().map(|p| Regex::new(p)).collect::<Result<_, _>>()?,
        })
    }

    fn is_excluded(&self, folded_label: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(folded_label))
    }

    /// 列名是否归属该字段（任一 include 命中且无 exclude 命中）
    pub fn matches(&self, label: &str) -> bool {
        let folded = fold_upper(label);
        !self.is_excluded(&folded) && self.include.iter().any(|re| re.is_match(&folded))
    }

    /// 按优先级查找首个未占用的匹配列
    ///
    /// # 参数
    /// - folded_labels: 已折叠的列名
    /// - claimed: 已被其他字段占用的列下标
    pub fn find(&self, folded_labels: &[String], claimed: &HashSet<usize>) -> Option<usize> {
        self.include.iter().find_map(|re| {
            folded_labels.iter().enumerate().find_map(|(idx, label)| {
                let usable = !claimed.contains(&idx)
                    && !label.is_empty()
                    && re.is_match(label)
                    && !self.is_excluded(label);
                usable.then_some(idx)
            })
        })
    }
}

// ==========================================
// FieldMap - 字段 → 列
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MappedColumn {
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    columns: HashMap<CanonicalField, MappedColumn>,
    pub diameter_columns: Vec<DiameterColumn>,
}

impl FieldMap {
    pub fn get(&self, field: CanonicalField) -> Option<&MappedColumn> {
        self.columns.get(&field)
    }

    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).map(|c| c.index)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn insert(&mut self, field: CanonicalField, column: MappedColumn) {
        self.columns.insert(field, column);
    }

    /// 全部已映射列下标（标量字段 + 直径列）
    pub fn mapped_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns
            .values()
            .map(|c| c.index)
            .chain(self.diameter_columns.iter().map(|c| c.index))
    }
}

// ==========================================
// ColumnMapper - 材料级映射器
// ==========================================
pub struct ColumnMapper {
    material: Material,
    strategies: Vec<ColumnPatterns>,
    diameters: Option<DiameterAggregator>, // 仅钢筋
    // 每组至少命中一个字段；组名用于错误信息
    required: Vec<(&'static str, Vec<CanonicalField>)>,
}

// 通用字段模式
const DATE_PATTERNS: &[&str] = &[r"TARIH", r"DATE"];
const SUPPLIER_PATTERNS: &[&str] = &[r"FIRMA", r"TEDARIKCI", r"SUPPLIER", r"SATICI"];
const WAYBILL_PATTERNS: &[&str] = &[
    r"IRSALIYE\s*(NO|NUMARASI)",
    r"IRSALIYE",
    r"WAYBILL",
    r"FIS\s*NO",
];
const WAYBILL_EXCLUDES: &[&str] = &[r"AGIRLIG", r"WEIGHT", r"KG", r"TARIH"];
const NOTES_PATTERNS: &[&str] = &[r"ACIKLAMA", r"^NOT", r"NOTES", r"REMARK"];

impl ColumnMapper {
    /// 构造材料对应的映射器
    pub fn for_material(material: Material) -> ImportResult<Self> {
        let mut specs: Vec<(CanonicalField, &[&str], &[&str])> = vec![
            (CanonicalField::Date, DATE_PATTERNS, &[r"IRSALIYE"][..]),
            (CanonicalField::Supplier, SUPPLIER_PATTERNS, &[][..]),
        ];

        let required = match material {
            Material::Concrete => {
                specs.extend([
                    (
                        CanonicalField::QuantityM3,
                        &[r"MIKTAR", r"M3", r"M³", r"QUANTITY", r"HACIM"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::ConcreteClass,
                        &[r"BETON\s*SINIF", r"SINIF", r"CLASS", r"CINS"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::DeliveryMethod,
                        &[r"DOKUM\s*SEKL", r"POMPA", r"METHOD", r"SEKL"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::LocationBlock,
                        &[r"BLOK", r"BLOCK", r"MAHAL", r"LOCATION", r"YER"][..],
                        &[][..],
                    ),
                ]);
                vec![
                    ("date", vec![CanonicalField::Date]),
                    ("quantity_m3", vec![CanonicalField::QuantityM3]),
                ]
            }
            Material::Rebar => {
                specs.extend([
                    (
                        CanonicalField::ProjectStage,
                        &[r"ETAP", r"STAGE"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::Manufacturer,
                        &[r"URETICI", r"MANUFACTURER", r"IMALATCI"][..],
                        &[][..],
                    ),
                ]);
                vec![("date", vec![CanonicalField::Date])]
            }
            Material::Mesh => {
                specs.extend([
                    (
                        CanonicalField::WaybillWeight,
                        &[r"IRSALIYE\s*AGIRLIG", r"WAYBILL\s*WEIGHT"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::WeightKg,
                        &[r"AGIRLIK", r"WEIGHT", r"TONAJ", r"KG"][..],
                        &[r"IRSALIYE", r"WAYBILL"][..],
                    ),
                    (
                        CanonicalField::PieceCount,
                        &[r"ADET", r"PIECE", r"QTY"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::MeshType,
                        &[r"HASIR\s*TIP", r"TIP", r"TYPE", r"CINS"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::Dimensions,
                        &[r"EBAT", r"OLCU", r"BOYUT", r"DIMENSION"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::Length,
                        &[r"UZUNLUK", r"LENGTH", r"^L(\s|\(|$)", r"^BOY(\s|\(|$)"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::Width,
                        &[r"GENISLIK", r"WIDTH", r"^EN(\s|\(|$)"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::UsageLocation,
                        &[r"KULLANIM\s*YER", r"KULLANIM", r"USAGE"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::Section,
                        &[r"^S\.?\s?S\.?$"][..],
                        &[][..],
                    ),
                    (
                        CanonicalField::ProjectStage,
                        &[r"ETAP", r"STAGE"][..],
                        &[][..],
                    ),
                ]);
                vec![
                    ("date", vec![CanonicalField::Date]),
                    (
                        "weight_kg | piece_count",
                        vec![CanonicalField::WeightKg, CanonicalField::PieceCount],
                    ),
                ]
            }
        };

        specs.push((CanonicalField::Waybill, WAYBILL_PATTERNS, WAYBILL_EXCLUDES));
        specs.push((CanonicalField::Notes, NOTES_PATTERNS, &[][..]));

        let strategies = specs
            .into_iter()
            .map(|(field, include, exclude)| ColumnPatterns::new(field, include, exclude))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ImportError::InternalError(format!("列名模式编译失败: {}", e)))?;

        let diameters = match material {
            Material::Rebar => Some(DiameterAggregator::new()?),
            _ => None,
        };

        Ok(Self {
            material,
            strategies,
            diameters,
            required,
        })
    }

    /// 单字段匹配策略
    pub fn strategy(&self, field: CanonicalField) -> Option<&ColumnPatterns> {
        self.strategies.iter().find(|s| s.field == field)
    }

    /// 建立字段映射
    ///
    /// # 返回
    /// - Ok(FieldMap): 未命中的可选字段不在映射中
    /// - Err(MissingMandatoryColumn): 必填字段（组）未命中
    pub fn map(&self, sheet_name: &str, labels: &[String]) -> ImportResult<FieldMap> {
        let folded: Vec<String> = labels.iter().map(|l| fold_upper(l)).collect();
        let mut claimed = HashSet::new();
        let mut field_map = FieldMap::default();

        if let Some(diameters) = &self.diameters {
            field_map.diameter_columns = diameters.discover(labels);
            if field_map.diameter_columns.is_empty() {
                return Err(ImportError::MissingMandatoryColumn {
                    sheet: sheet_name.to_string(),
                    field: "diameter columns".to_string(),
                });
            }
            claimed.extend(field_map.diameter_columns.iter().map(|c| c.index));
        }

        for strategy in &self.strategies {
            if let Some(index) = strategy.find(&folded, &claimed) {
                claimed.insert(index);
                field_map.insert(
                    strategy.field,
                    MappedColumn {
                        index,
                        label: labels[index].clone(),
                    },
                );
            }
        }

        for (group_name, fields) in &self.required {
            if !fields.iter().any(|f| field_map.contains(*f)) {
                return Err(ImportError::MissingMandatoryColumn {
                    sheet: sheet_name.to_string(),
                    field: group_name.to_string(),
                });
            }
        }

        debug!(
            sheet = sheet_name,
            material = %self.material,
            mapped = field_map.columns.len(),
            diameters = field_map.diameter_columns.len(),
            "列映射完成"
        );

        Ok(field_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_strategy_matches_alone() {
        let mapper = ColumnMapper::for_material(Material::Mesh).unwrap();
        let waybill = mapper.strategy(CanonicalField::Waybill).unwrap();
        assert!(waybill.matches("İrsaliye No"));
        assert!(!waybill.matches("İrsaliye Ağırlığı"));

        let weight = mapper.strategy(CanonicalField::WaybillWeight).unwrap();
        assert!(weight.matches("İrsaliye Ağırlığı"));
        assert!(mapper.strategy(CanonicalField::QuantityM3).is_none());
    }

    #[test]
    fn test_concrete_synonyms() {
        let mapper = ColumnMapper::for_material(Material::Concrete).unwrap();
        let map = mapper
            .map(
                "Sayfa1",
                &labels(&["Tarih", "Firma Adı", "İrsaliye No", "Beton Sınıfı", "Miktar (m³)", "Blok"]),
            )
            .unwrap();

        assert_eq!(map.index(CanonicalField::Date), Some(0));
        assert_eq!(map.index(CanonicalField::Supplier), Some(1));
        assert_eq!(map.index(CanonicalField::Waybill), Some(2));
        assert_eq!(map.index(CanonicalField::ConcreteClass), Some(3));
        assert_eq!(map.index(CanonicalField::QuantityM3), Some(4));
        assert_eq!(map.index(CanonicalField::LocationBlock), Some(5));
        assert!(!map.contains(CanonicalField::DeliveryMethod));
    }

    #[test]
    fn test_missing_quantity_is_fatal() {
        let mapper = ColumnMapper::for_material(Material::Concrete).unwrap();
        let result = mapper.map("Sayfa1", &labels(&["TARİH", "FİRMA"]));
        match result {
            Err(ImportError::MissingMandatoryColumn { field, .. }) => assert_eq!(field, "quantity_m3"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_waybill_weight_not_taken_as_waybill() {
        let mapper = ColumnMapper::for_material(Material::Mesh).unwrap();
        let map = mapper
            .map(
                "HASIR",
                &labels(&["TARİH", "İRSALİYE AĞIRLIĞI", "İRSALİYE NO", "AĞIRLIK (KG)", "ADET"]),
            )
            .unwrap();

        assert_eq!(map.index(CanonicalField::WaybillWeight), Some(1));
        assert_eq!(map.index(CanonicalField::Waybill), Some(2));
        assert_eq!(map.index(CanonicalField::WeightKg), Some(3));
        assert_eq!(map.index(CanonicalField::PieceCount), Some(4));
    }

    #[test]
    fn test_mesh_accepts_piece_count_only() {
        let mapper = ColumnMapper::for_material(Material::Mesh).unwrap();
        let map = mapper.map("HASIR", &labels(&["TARİH", "ADET"])).unwrap();
        assert!(map.contains(CanonicalField::PieceCount));
        assert!(!map.contains(CanonicalField::WeightKg));
    }

    #[test]
    fn test_rebar_requires_diameter_columns() {
        let mapper = ColumnMapper::for_material(Material::Rebar).unwrap();
        let result = mapper.map("DEMİR", &labels(&["TARİH", "FİRMA", "ETAP"]));
        assert!(matches!(
            result,
            Err(ImportError::MissingMandatoryColumn { ref field, .. }) if field == "diameter columns"
        ));
    }

    #[test]
    fn test_rebar_diameter_columns_not_reused() {
        let mapper = ColumnMapper::for_material(Material::Rebar).unwrap();
        let map = mapper
            .map("DEMİR", &labels(&["TARİH", "FİRMA", "Q8", "10'LUK", "ETAP", "NOT"]))
            .unwrap();

        assert_eq!(map.diameter_columns.len(), 2);
        assert_eq!(map.index(CanonicalField::ProjectStage), Some(4));
        assert_eq!(map.index(CanonicalField::Notes), Some(5));
    }

    #[test]
    fn test_pattern_priority_over_column_order() {
        let patterns = ColumnPatterns::new(
            CanonicalField::Waybill,
            WAYBILL_PATTERNS,
            WAYBILL_EXCLUDES,
        )
        .unwrap();
        let folded = vec!["IRSALIYE TARIHI".to_string(), "IRSALIYE".to_string(), "IRSALIYE NO".to_string()];

        assert_eq!(patterns.find(&folded, &HashSet::new()), Some(2));
        assert!(patterns.matches("İrsaliye"));
        assert!(!patterns.matches("İrsaliye Tarihi"));
    }
}
