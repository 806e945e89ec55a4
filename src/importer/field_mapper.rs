// ==========================================
// 零售补货分析系统 - 快照字段映射器
// ==========================================
// 职责: 文件名日期段提取 + 源列名 → 规范快照字段
// 约定: 文件名形如 *-<起始日>-<截止日>.<ext>,两个内嵌 YYYY-MM-DD,
//       取较晚者作为报表截止日
// ==========================================

use crate::config::settings::ColumnMapping;
use crate::domain::records::SnapshotRow;
use crate::domain::sku::Sku;
use crate::domain::types::LocationCode;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRecord;
use chrono::NaiveDate;

// ==========================================
// SnapshotFieldMapper - 快照字段映射器
// ==========================================
pub struct SnapshotFieldMapper {
    mapping: ColumnMapping,
    cleaner: DataCleaner,
}

impl SnapshotFieldMapper {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self {
            mapping,
            cleaner: DataCleaner,
        }
    }

    /// 从文件名提取报表截止日
    ///
    /// 扫描文件名中全部 YYYY-MM-DD 片段;不足两个视为不符合约定。
    /// 返回两个日期中较晚的一个 (快照覆盖段的截止日)。
    pub fn extract_report_end_date(filename: &str) -> ImportResult<NaiveDate> {
        let dates = find_embedded_dates(filename);
        if dates.len() < 2 {
            return Err(ImportError::DateRangeMissing(filename.to_string()));
        }
        // 取较晚者
        dates
            .into_iter()
            .max()
            .ok_or_else(|| ImportError::DateRangeMissing(filename.to_string()))
    }

    /// 单行映射: 原始快照行 → 规范 SnapshotRow
    ///
    /// # 返回
    /// - `Some(SnapshotRow)`: 映射成功
    /// - `None`: SKU 无法标准化,调用方应计数并排除
    pub fn map_snapshot_row(
        &self,
        row: &RawRecord,
        report_end_date: NaiveDate,
    ) -> Option<SnapshotRow> {
        let sku = Sku::parse(row.get(&self.mapping.sku).map(String::as_str).unwrap_or(""))?;

        // 门店列缺失时整行归入 Unmapped
        let location = row
            .get(&self.mapping.location)
            .map(|v| LocationCode::from_raw(v))
            .unwrap_or(LocationCode::Unmapped);

        let quantity_sold = row
            .get(&self.mapping.qty_sold)
            .map(|v| self.cleaner.clean_currency(v))
            .unwrap_or(0.0);

        // 净销售额可选,清洗后带入历史行
        let net_sales = self
            .cleaner
            .normalize_null(row.get(&self.mapping.net_sales).cloned())
            .map(|v| self.cleaner.clean_currency(&v));

        Some(SnapshotRow {
            sku,
            location,
            report_end_date,
            quantity_sold,
            net_sales,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 扫描字符串中全部 YYYY-MM-DD 片段
fn find_embedded_dates(text: &str) -> Vec<NaiveDate> {
    let bytes = text.as_bytes();
    let mut dates = Vec::new();

    if bytes.len() < 10 {
        return dates;
    }

    for i in 0..=bytes.len() - 10 {
        let window = &bytes[i..i + 10];
        let looks_like_date = window.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
        if !looks_like_date {
            continue;
        }
        // 窗口全为 ASCII,切片必然落在字符边界上
        if let Ok(date) = NaiveDate::parse_from_str(&text[i..i + 10], "%Y-%m-%d") {
            dates.push(date);
        }
    }

    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn raw_row(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn test_extract_report_end_date_takes_later() {
        let date =
            SnapshotFieldMapper::extract_report_end_date("product-sales-2025-11-01-2025-11-30.csv")
                .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 11, 30).unwrap());

        // 日期顺序颠倒也取较晚者
        let date =
            SnapshotFieldMapper::extract_report_end_date("product-sales-2025-11-30-2025-11-01.csv")
                .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 11, 30).unwrap());
    }

    #[test]
    fn test_extract_report_end_date_rejects_single_date() {
        let result = SnapshotFieldMapper::extract_report_end_date("product-sales-2025-11-30.csv");
        assert!(matches!(result, Err(ImportError::DateRangeMissing(_))));
    }

    #[test]
    fn test_extract_ignores_invalid_calendar_dates() {
        // 2025-13-99 不是合法日期,只剩一个有效片段 → 拒绝
        let result =
            SnapshotFieldMapper::extract_report_end_date("product-sales-2025-13-99-2025-11-30.csv");
        assert!(result.is_err());
    }

    #[test]
    fn test_map_snapshot_row_basic() {
        let mapper = SnapshotFieldMapper::new(ColumnMapping::default());
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let row = raw_row(&[
            ("SKU", "cnb-1001.0"),
            ("Quantity", "12"),
            ("Location", "Hill Street"),
            ("Net sales", "$240.00"),
        ]);

        let snapshot = mapper.map_snapshot_row(&row, date).unwrap();
        assert_eq!(snapshot.sku.as_str(), "CNB-1001");
        assert_eq!(snapshot.location, LocationCode::Hill);
        assert_eq!(snapshot.quantity_sold, 12.0);
        assert_eq!(snapshot.net_sales, Some(240.0));
    }

    #[test]
    fn test_map_snapshot_row_invalid_sku_excluded() {
        let mapper = SnapshotFieldMapper::new(ColumnMapping::default());
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let row = raw_row(&[("SKU", "---"), ("Quantity", "3")]);
        assert!(mapper.map_snapshot_row(&row, date).is_none());
    }

    #[test]
    fn test_map_snapshot_row_missing_location_is_unmapped() {
        let mapper = SnapshotFieldMapper::new(ColumnMapping::default());
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let row = raw_row(&[("SKU", "CNB-1001"), ("Quantity", "3")]);
        let snapshot = mapper.map_snapshot_row(&row, date).unwrap();
        assert_eq!(snapshot.location, LocationCode::Unmapped);
        assert_eq!(snapshot.net_sales, None);
    }
}
