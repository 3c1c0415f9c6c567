// ==========================================
// 工地材料进场导入 - 合成主键生成器
// ==========================================
// 职责: 运单号缺失时由记录内容生成稳定主键
// 格式: AUTO- + SHA-256(date|supplier|<材料字段>|row:<行号>) 前 8 位十六进制
// 红线: 同一源文件重复导入得到相同主键；行号保证内容相同的行主键不同
// ==========================================

use crate::domain::delivery::{CanonicalRecord, KeySource};
use sha2::{Digest, Sha256};

pub const SYNTHETIC_KEY_PREFIX: &str = "AUTO-";

const HASH_PREFIX_LEN: usize = 8;

pub struct SurrogateKeyGenerator;

impl SurrogateKeyGenerator {
    /// 参与哈希的内容文本
    pub fn key_material(record: &CanonicalRecord) -> String {
        let parts = match record {
            CanonicalRecord::Concrete(r) => format!(
                "{}|{:.3}|{}",
                r.concrete_class, r.quantity_m3, r.location_block
            ),
            CanonicalRecord::Rebar(r) => {
                let buckets: Vec<String> = r.weights.iter().map(|(_, kg)| format!("{:.3}", kg)).collect();
                format!(
                    "{}|{}",
                    buckets.join(","),
                    r.project_stage.as_deref().unwrap_or("")
                )
            }
            CanonicalRecord::Mesh(r) => format!("{}|{:.3}", r.mesh_type, r.weight_kg),
        };

        format!(
            "{}|{}|{}|row:{}",
            record.date().format("%Y-%m-%d"),
            record.supplier(),
            parts,
            record.source_row()
        )
    }

    /// 生成合成主键
    pub fn generate(record: &CanonicalRecord) -> String {
        let digest = Sha256::digest(Self::key_material(record).as_bytes());
        let hex = hex::encode(digest);
        format!("{}{}", SYNTHETIC_KEY_PREFIX, &hex[..HASH_PREFIX_LEN])
    }

    /// 运单号为空时写入合成主键
    ///
    /// # 返回
    /// - true: 已写入合成主键
    /// - false: 记录已有运单号，未改动
    pub fn assign(record: &mut CanonicalRecord) -> bool {
        if !record.waybill_no().trim().is_empty() {
            return false;
        }
        let key = Self::generate(record);
        record.set_waybill(key, KeySource::Synthetic);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::ConcreteDelivery;
    use crate::domain::types::{ConcreteClass, DeliveryMethod};
    use chrono::NaiveDate;

    fn record(source_row: usize, waybill: &str) -> CanonicalRecord {
        CanonicalRecord::Concrete(ConcreteDelivery {
            date: NaiveDate::from_ymd_opt(2023, 11, 24).unwrap(),
            supplier: "ALBAYRAK".to_string(),
            waybill_no: waybill.to_string(),
            key_source: KeySource::Synthetic,
            concrete_class: ConcreteClass::C30,
            delivery_method: DeliveryMethod::Mixer,
            quantity_m3: 8.0,
            location_block: "Unknown".to_string(),
            notes: None,
            source_row,
        })
    }

    #[test]
    fn test_key_stable_across_runs() {
        let first = SurrogateKeyGenerator::generate(&record(4, ""));
        let second = SurrogateKeyGenerator::generate(&record(4, ""));

        assert_eq!(first, second);
        assert!(first.starts_with(SYNTHETIC_KEY_PREFIX));
        assert_eq!(first.len(), SYNTHETIC_KEY_PREFIX.len() + 8);
    }

    #[test]
    fn test_row_number_breaks_ties() {
        let a = SurrogateKeyGenerator::generate(&record(4, ""));
        let b = SurrogateKeyGenerator::generate(&record(5, ""));
        assert_ne!(a, b);
    }

    #[test]
    fn test_assign_only_when_blank() {
        let mut natural = record(2, "IRS-9");
        assert!(!SurrogateKeyGenerator::assign(&mut natural));
        assert_eq!(natural.waybill_no(), "IRS-9");

        let mut blank = record(2, "");
        assert!(SurrogateKeyGenerator::assign(&mut blank));
        assert!(blank.waybill_no().starts_with("AUTO-"));
        assert_eq!(blank.key_source(), KeySource::Synthetic);
    }

    #[test]
    fn test_key_material_layout() {
        assert_eq!(
            SurrogateKeyGenerator::key_material(&record(7, "")),
            "2023-11-24|ALBAYRAK|C30|8.000|Unknown|row:7"
        );
    }
}
