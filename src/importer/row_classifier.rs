// ==========================================
// 工地材料进场导入 - 行分类器
// ==========================================
// 职责: 单行 → Accepted(标准化记录) / Skipped(原因) / Error(行级错误)
// 规则顺序: 已映射列全空 → 合计行 → 必填字段/解析错误 → 主数量 <= 0 → 接收
// 红线: 运单号为空时保持空串，由合成主键生成器补齐
// ==========================================

use crate::config::ImportSettings;
use crate::domain::delivery::{
    CanonicalRecord, ConcreteDelivery, KeySource, MeshDelivery, RebarDelivery,
};
use crate::domain::import_report::{RowError, RowErrorKind, SkipReason};
use crate::domain::raw_table::RawRow;
use crate::domain::types::{ConcreteClass, DeliveryMethod, Material, MeshType};
use crate::importer::diameter_aggregator::{DiameterAggregator, DiameterCellProblem};
use crate::importer::field_mapper::{CanonicalField, FieldMap};
use crate::importer::field_normalizer::{fold_upper, format_number, FieldNormalizer};
use chrono::NaiveDate;

/// 合计行标记（折叠后子串匹配；GENEL TOPLAM / ARA TOPLAM 均含 TOPLAM）
pub const TOTAL_MARKERS: [&str; 2] = ["TOPLAM", "TOTAL"];

/// 供应商缺失时的占位值
pub const UNKNOWN_SUPPLIER: &str = "UNKNOWN";

/// 钢筋网运单重量与实际重量的容差（kg）
const WAYBILL_WEIGHT_TOLERANCE_KG: f64 = 1.0;

/// 备注拼接分隔符
const NOTE_SEPARATOR: &str = " | ";

// ==========================================
// RowOutcome - 单行分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(CanonicalRecord),
    Skipped(SkipReason),
    Error(RowError),
}

// 内部短路结果
enum Rejection {
    Skip(SkipReason),
    Error(RowError),
}

type Classified<T> = Result<T, Rejection>;

pub struct RowClassifier<'a> {
    material: Material,
    field_map: &'a FieldMap,
    settings: &'a ImportSettings,
    normalizer: FieldNormalizer,
}

impl<'a> RowClassifier<'a> {
    pub fn new(material: Material, field_map: &'a FieldMap, settings: &'a ImportSettings) -> Self {
        Self {
            material,
            field_map,
            settings,
            normalizer: FieldNormalizer,
        }
    }

    /// 分类单行
    pub fn classify(&self, row: &RawRow) -> RowOutcome {
        if row.is_blank_at(self.field_map.mapped_indices()) {
            return RowOutcome::Skipped(SkipReason::BlankRow);
        }
        if Self::is_total_row(row) {
            return RowOutcome::Skipped(SkipReason::TotalRow);
        }

        let built = match self.material {
            Material::Concrete => self.build_concrete(row),
            Material::Rebar => self.build_rebar(row),
            Material::Mesh => self.build_mesh(row),
        };

        match built {
            Ok(record) => RowOutcome::Accepted(record),
            Err(Rejection::Skip(reason)) => RowOutcome::Skipped(reason),
            Err(Rejection::Error(error)) => RowOutcome::Error(error),
        }
    }

    /// 任一文本单元格含合计标记
    pub fn is_total_row(row: &RawRow) -> bool {
        row.cells.iter().any(|cell| {
            let folded = fold_upper(&cell.as_text());
            TOTAL_MARKERS.iter().any(|m| folded.contains(m))
        })
    }

    // ===== 通用字段 =====

    fn error(row: &RawRow, kind: RowErrorKind, field: &str, reason: String) -> Rejection {
        Rejection::Error(RowError {
            row_number: row.row_number,
            kind,
            field: field.to_string(),
            reason,
        })
    }

    fn text(&self, row: &RawRow, field: CanonicalField) -> Option<String> {
        let index = self.field_map.index(field)?;
        self.normalizer.clean_text(row.cell(index), false)
    }

    fn date(&self, row: &RawRow) -> Classified<NaiveDate> {
        let field = CanonicalField::Date;
        let cell = self
            .field_map
            .index(field)
            .map(|i| row.cell(i))
            .filter(|c| !c.is_blank())
            .ok_or_else(|| {
                Self::error(row, RowErrorKind::MissingMandatoryField, field.name(), "日期为空".to_string())
            })?;

        self.normalizer
            .parse_date(cell)
            .map_err(|e| Self::error(row, RowErrorKind::UnparsableDate, field.name(), e.to_string()))
    }

    /// 主数量：空白为必填缺失，解析失败为数值错误
    fn required_number(&self, row: &RawRow, field: CanonicalField) -> Classified<f64> {
        let cell = self
            .field_map
            .index(field)
            .map(|i| row.cell(i))
            .filter(|c| !c.is_blank())
            .ok_or_else(|| {
                Self::error(
                    row,
                    RowErrorKind::MissingMandatoryField,
                    field.name(),
                    format!("{} 为空", field.name()),
                )
            })?;

        self.normalizer
            .parse_number(cell)
            .map_err(|e| Self::error(row, RowErrorKind::UnparsableNumber, field.name(), e.to_string()))
    }

    /// 可选数值：列缺失或空白为 None，解析失败为数值错误
    fn optional_number(&self, row: &RawRow, field: CanonicalField) -> Classified<Option<f64>> {
        match self.field_map.index(field).map(|i| row.cell(i)) {
            None => Ok(None),
            Some(cell) if cell.is_blank() => Ok(None),
            Some(cell) => self
                .normalizer
                .parse_number(cell)
                .map(Some)
                .map_err(|e| {
                    Self::error(row, RowErrorKind::UnparsableNumber, field.name(), e.to_string())
                }),
        }
    }

    fn supplier(&self, row: &RawRow) -> String {
        self.field_map
            .index(CanonicalField::Supplier)
            .and_then(|i| self.normalizer.clean_text(row.cell(i), true))
            .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string())
    }

    /// 源运单号（空则待合成）
    fn waybill(&self, row: &RawRow) -> (String, KeySource) {
        match self.text(row, CanonicalField::Waybill) {
            Some(waybill) => (waybill, KeySource::Natural),
            None => (String::new(), KeySource::Synthetic),
        }
    }

    fn join_notes(parts: Vec<Option<String>>) -> Option<String> {
        let parts: Vec<String> = parts.into_iter().flatten().collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(NOTE_SEPARATOR))
        }
    }

    // ===== 混凝土 =====

    fn build_concrete(&self, row: &RawRow) -> Classified<CanonicalRecord> {
        let date = self.date(row)?;
        let quantity_m3 = self.required_number(row, CanonicalField::QuantityM3)?;
        if quantity_m3 <= 0.0 {
            return Err(Rejection::Skip(SkipReason::NonPositiveQuantity));
        }

        let (waybill_no, key_source) = self.waybill(row);

        Ok(CanonicalRecord::Concrete(ConcreteDelivery {
            date,
            supplier: self.supplier(row),
            waybill_no,
            key_source,
            concrete_class: self
                .text(row, CanonicalField::ConcreteClass)
                .map(|c| ConcreteClass::normalize(&c))
                .unwrap_or(ConcreteClass::Other),
            delivery_method: DeliveryMethod::normalize(
                self.text(row, CanonicalField::DeliveryMethod).as_deref(),
            ),
            quantity_m3,
            location_block: self
                .text(row, CanonicalField::LocationBlock)
                .unwrap_or_else(|| self.settings.default_location_block.clone()),
            notes: self.text(row, CanonicalField::Notes),
            source_row: row.row_number,
        }))
    }

    // ===== 钢筋 =====

    fn build_rebar(&self, row: &RawRow) -> Classified<CanonicalRecord> {
        let date = self.date(row)?;

        let aggregated =
            DiameterAggregator::aggregate(row, &self.field_map.diameter_columns, &self.normalizer)
                .map_err(|e| {
                    let kind = match e.problem {
                        DiameterCellProblem::Unparsable(_) => RowErrorKind::UnparsableNumber,
                        DiameterCellProblem::Negative(_) => RowErrorKind::InvalidPrimaryQuantity,
                    };
                    Self::error(row, kind, &e.label, e.problem.to_string())
                })?;

        // 负数分档已在汇总时拒绝，合计 <= 阈值只是占位行
        if aggregated.weights.total() <= self.settings.min_rebar_total_kg {
            return Err(Rejection::Skip(SkipReason::NonPositiveQuantity));
        }

        let (waybill_no, key_source) = self.waybill(row);

        Ok(CanonicalRecord::Rebar(RebarDelivery {
            date,
            supplier: self.supplier(row),
            waybill_no,
            key_source,
            project_stage: self.text(row, CanonicalField::ProjectStage),
            manufacturer: self.text(row, CanonicalField::Manufacturer),
            weights: aggregated.weights,
            notes: Self::join_notes(vec![
                self.text(row, CanonicalField::Notes),
                aggregated.fold_note(),
            ]),
            source_row: row.row_number,
        }))
    }

    // ===== 钢筋网 =====

    fn build_mesh(&self, row: &RawRow) -> Classified<CanonicalRecord> {
        let date = self.date(row)?;

        let weight = self.optional_number(row, CanonicalField::WeightKg)?;
        let pieces = self.optional_number(row, CanonicalField::PieceCount)?;

        // 两个主数量都为空 → 必填缺失
        let (weight_kg, piece_count) = match (weight, pieces) {
            (None, None) => {
                let field = if self.field_map.contains(CanonicalField::WeightKg) {
                    CanonicalField::WeightKg
                } else {
                    CanonicalField::PieceCount
                };
                return Err(Self::error(
                    row,
                    RowErrorKind::MissingMandatoryField,
                    field.name(),
                    "重量与数量均为空".to_string(),
                ));
            }
            (w, p) => (w.unwrap_or(0.0), p.unwrap_or(0.0)),
        };

        if weight_kg < 0.0 || piece_count < 0.0 {
            let field = if weight_kg < 0.0 {
                CanonicalField::WeightKg
            } else {
                CanonicalField::PieceCount
            };
            return Err(Self::error(
                row,
                RowErrorKind::InvalidPrimaryQuantity,
                field.name(),
                format!("{} 为负数", field.name()),
            ));
        }
        if piece_count.fract() != 0.0 || piece_count > f64::from(u32::MAX) {
            let field = CanonicalField::PieceCount;
            return Err(Self::error(
                row,
                RowErrorKind::UnparsableNumber,
                field.name(),
                format!("{} 不是整数: {}", field.name(), format_number(piece_count)),
            ));
        }
        if weight_kg <= 0.0 && piece_count <= 0.0 {
            return Err(Rejection::Skip(SkipReason::NonPositiveQuantity));
        }

        let raw_type = self.text(row, CanonicalField::MeshType);
        let mesh_type = raw_type
            .as_deref()
            .map(MeshType::normalize)
            .unwrap_or(MeshType::Other);
        let type_note = raw_type
            .filter(|raw| !MeshType::is_exact(raw))
            .map(|raw| format!("Tip: {}", raw));

        let waybill_note = self
            .optional_number(row, CanonicalField::WaybillWeight)
            .ok()
            .flatten()
            .filter(|w| *w > 0.0 && (w - weight_kg).abs() > WAYBILL_WEIGHT_TOLERANCE_KG)
            .map(|w| format!("Irsaliye: {} kg", format_number(w)));

        let (waybill_no, key_source) = self.waybill(row);

        Ok(CanonicalRecord::Mesh(MeshDelivery {
            date,
            supplier: self.supplier(row),
            waybill_no,
            key_source,
            mesh_type,
            dimensions: self.mesh_dimensions(row),
            piece_count: piece_count as u32,
            weight_kg,
            usage_location: self
                .text(row, CanonicalField::UsageLocation)
                .or_else(|| self.text(row, CanonicalField::Section))
                .or_else(|| self.text(row, CanonicalField::ProjectStage)),
            notes: Self::join_notes(vec![
                self.text(row, CanonicalField::Notes),
                type_note,
                waybill_note,
            ]),
            source_row: row.row_number,
        }))
    }

    /// 尺寸：优先尺寸列，否则由长 × 宽拼成 "<L>x<e>m"
    fn mesh_dimensions(&self, row: &RawRow) -> Option<String> {
        if let Some(dimensions) = self.text(row, CanonicalField::Dimensions) {
            return Some(dimensions);
        }

        let number = |field| -> Option<f64> {
            self.optional_number(row, field)
                .ok()
                .flatten()
                .filter(|v| *v > 0.0)
        };

        match (number(CanonicalField::Length), number(CanonicalField::Width)) {
            (Some(l), Some(e)) => Some(format!("{}x{}m", format_number(l), format_number(e))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::raw_table::CellValue;
    use crate::importer::field_mapper::ColumnMapper;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn row(row_number: usize, values: &[&str]) -> RawRow {
        RawRow {
            row_number,
            cells: values.iter().map(|v| CellValue::from(*v)).collect(),
        }
    }

    fn field_map(material: Material, header: &[&str]) -> FieldMap {
        ColumnMapper::for_material(material)
            .unwrap()
            .map("test", &labels(header))
            .unwrap()
    }

    const CONCRETE_HEADER: &[&str] = &["TARİH", "FİRMA", "İRSALİYE NO", "BETON SINIFI", "MİKTAR", "DÖKÜM ŞEKLİ", "BLOK"];

    #[test]
    fn test_concrete_accepted_with_defaults() {
        let map = field_map(Material::Concrete, CONCRETE_HEADER);
        let settings = ImportSettings::default();
        let classifier = RowClassifier::new(Material::Concrete, &map, &settings);

        let outcome = classifier.classify(&row(2, &["24.11.2023", " albayrak ", "", "C 30/37", "12,5", "Pompalı", ""]));

        match outcome {
            RowOutcome::Accepted(CanonicalRecord::Concrete(r)) => {
                assert_eq!(r.date, NaiveDate::from_ymd_opt(2023, 11, 24).unwrap());
                assert_eq!(r.supplier, "ALBAYRAK");
                assert_eq!(r.waybill_no, "");
                assert_eq!(r.key_source, KeySource::Synthetic);
                assert_eq!(r.concrete_class, ConcreteClass::C30);
                assert_eq!(r.delivery_method, DeliveryMethod::Pumped);
                assert_eq!(r.quantity_m3, 12.5);
                assert_eq!(r.location_block, "Unknown");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_concrete_rule_order() {
        let map = field_map(Material::Concrete, CONCRETE_HEADER);
        let settings = ImportSettings::default();
        let c = RowClassifier::new(Material::Concrete, &map, &settings);

        assert_eq!(c.classify(&row(2, &["", "", "", "", "", "", ""])), RowOutcome::Skipped(SkipReason::BlankRow));
        assert_eq!(
            c.classify(&row(3, &["", "GENEL TOPLAM", "", "", "120", "", ""])),
            RowOutcome::Skipped(SkipReason::TotalRow)
        );
        assert_eq!(
            c.classify(&row(4, &["24.11.2023", "A", "1", "C30", "0", "", ""])),
            RowOutcome::Skipped(SkipReason::NonPositiveQuantity)
        );

        match c.classify(&row(5, &["", "A", "1", "C30", "0", "", ""])) {
            RowOutcome::Error(e) => {
                assert_eq!(e.kind, RowErrorKind::MissingMandatoryField);
                assert_eq!(e.row_number, 5);
                assert_eq!(e.field, "date");
            }
            other => panic!("unexpected: {:?}", other),
        }

        match c.classify(&row(6, &["yarın", "A", "1", "C30", "5", "", ""])) {
            RowOutcome::Error(e) => assert_eq!(e.kind, RowErrorKind::UnparsableDate),
            other => panic!("unexpected: {:?}", other),
        }

        match c.classify(&row(7, &["24.11.2023", "A", "1", "C30", "", "", ""])) {
            RowOutcome::Error(e) => {
                assert_eq!(e.kind, RowErrorKind::MissingMandatoryField);
                assert_eq!(e.field, "quantity_m3");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unmapped_filled_column_still_blank_row() {
        let map = field_map(Material::Concrete, &["SIRA NO", "TARİH", "FİRMA", "İRSALİYE NO", "MİKTAR"]);
        let settings = ImportSettings::default();
        let c = RowClassifier::new(Material::Concrete, &map, &settings);

        assert_eq!(c.classify(&row(3, &["2", "", "", "", ""])), RowOutcome::Skipped(SkipReason::BlankRow));

        match c.classify(&row(4, &["3", "", "Albayrak", "", ""])) {
            RowOutcome::Error(e) => assert_eq!(e.field, "date"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rebar_negative_bucket_beats_threshold_skip() {
        let map = field_map(Material::Rebar, &["TARİH", "FİRMA", "İRSALİYE NO", "Ø8", "24'LİK", "25'LİK"]);
        let settings = ImportSettings::default();
        let c = RowClassifier::new(Material::Rebar, &map, &settings);

        match c.classify(&row(2, &["24.11.2023", "Kaptan", "R-1", "-500", "", ""])) {
            RowOutcome::Error(e) => {
                assert_eq!(e.kind, RowErrorKind::InvalidPrimaryQuantity);
                assert_eq!(e.field, "Ø8");
            }
            other => panic!("unexpected: {:?}", other),
        }

        match c.classify(&row(3, &["24.11.2023", "Kaptan", "R-2", "", "-100", "1000"])) {
            RowOutcome::Error(e) => {
                assert_eq!(e.kind, RowErrorKind::InvalidPrimaryQuantity);
                assert_eq!(e.field, "24'LİK");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rebar_fold_note_and_threshold() {
        let map = field_map(Material::Rebar, &["TARİH", "FİRMA", "İRSALİYE NO", "24'LİK", "25'LİK", "AÇIKLAMA"]);
        let settings = ImportSettings::default();
        let c = RowClassifier::new(Material::Rebar, &map, &settings);

        match c.classify(&row(2, &["24.11.2023", "Kaptan", "D-1", "150", "1000", "acil"])) {
            RowOutcome::Accepted(CanonicalRecord::Rebar(r)) => {
                assert_eq!(r.weights.get(25), Some(1150.0));
                assert_eq!(r.total_weight_kg(), 1150.0);
                assert_eq!(r.notes.as_deref(), Some("acil | 150kg Q24 dahil"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert_eq!(
            c.classify(&row(3, &["24.11.2023", "Kaptan", "D-2", "", "1", ""])),
            RowOutcome::Skipped(SkipReason::NonPositiveQuantity)
        );

        match c.classify(&row(4, &["24.11.2023", "Kaptan", "D-3", "x1,2.3.4,5", "10", ""])) {
            RowOutcome::Error(e) => {
                assert_eq!(e.kind, RowErrorKind::UnparsableNumber);
                assert_eq!(e.field, "24'LİK");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_mesh_notes_and_dimensions() {
        let map = field_map(
            Material::Mesh,
            &["TARİH", "FİRMA", "HASIR TİPİ", "UZUNLUK", "EN", "ADET", "AĞIRLIK", "İRSALİYE AĞIRLIĞI", "SS"],
        );
        let settings = ImportSettings::default();
        let c = RowClassifier::new(Material::Mesh, &map, &settings);

        match c.classify(&row(2, &["24.11.2023", "Çelik", "Q131", "5", "2,15", "40", "1.250,5", "1260", "B2"])) {
            RowOutcome::Accepted(CanonicalRecord::Mesh(r)) => {
                assert_eq!(r.mesh_type, MeshType::Q);
                assert_eq!(r.dimensions.as_deref(), Some("5x2.15m"));
                assert_eq!(r.piece_count, 40);
                assert_eq!(r.weight_kg, 1250.5);
                assert_eq!(r.usage_location.as_deref(), Some("B2"));
                assert_eq!(r.notes.as_deref(), Some("Tip: Q131 | Irsaliye: 1260 kg"));
                assert_eq!(r.supplier, "ÇELIK");
            }
            other => panic!("unexpected: {:?}", other),
        }

        match c.classify(&row(3, &["24.11.2023", "Çelik", "R", "", "", "-2", "10", "", ""])) {
            RowOutcome::Error(e) => assert_eq!(e.kind, RowErrorKind::InvalidPrimaryQuantity),
            other => panic!("unexpected: {:?}", other),
        }

        assert_eq!(
            c.classify(&row(4, &["24.11.2023", "Çelik", "R", "", "", "0", "0", "", ""])),
            RowOutcome::Skipped(SkipReason::NonPositiveQuantity)
        );

        match c.classify(&row(5, &["24.11.2023", "Çelik", "R", "", "", "", "", "", ""])) {
            RowOutcome::Error(e) => assert_eq!(e.kind, RowErrorKind::MissingMandatoryField),
            other => panic!("unexpected: {:?}", other),
        }

        match c.classify(&row(6, &["24.11.2023", "Çelik", "R", "", "", "2,5", "10", "", ""])) {
            RowOutcome::Error(e) => {
                assert_eq!(e.kind, RowErrorKind::UnparsableNumber);
                assert_eq!(e.field, "piece_count");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
