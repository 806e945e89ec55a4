// ==========================================
// 零售补货分析系统 - 多门店对账引擎
// ==========================================
// 职责: 库存导出 + 销售导出 + 调拨记录 + 采购单
//       → 每 (SKU, 门店) 的 {在库, 净在途, 销量} 三元组
// 红线: 所有连接以标准化 SKU 为键;无法标准化的行排除并计数,
//       不得按部分匹配静默合并
// 约定: 单元格清洗永不中断;门店无法归属以警告上报
// ==========================================

use crate::config::settings::ColumnMapping;
use crate::diagnostics::{DiagnosticLine, DiagnosticsSink};
use crate::domain::records::{
    PurchaseOrderRecord, ReconcileDiagnostics, ReconciledRecord, TransferRecord,
};
use crate::domain::sku::Sku;
use crate::domain::types::LocationCode;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::file_parser::RawRecord;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// 库存列标记词: 表头同时含门店名与其一者计入该门店在库量
const STOCK_COLUMN_MARKERS: [&str; 3] = ["Sales", "Storage", "Inventory"];

// ==========================================
// ReconcileInput - 对账输入
// ==========================================
/// 对账输入: 原始表格行在此边界内完成类型化,引擎下游只见类型化值
pub struct ReconcileInput {
    /// 库存导出行 (SKU + 按门店的库存列)
    pub inventory_rows: Vec<RawRecord>,
    /// 销售导出行 (SKU, 门店, 销量, 货币字段)
    pub sales_rows: Vec<RawRecord>,
    /// 类型化调拨记录
    pub transfers: Vec<TransferRecord>,
    /// 类型化采购单记录
    pub purchase_orders: Vec<PurchaseOrderRecord>,
    /// 箱规参考 (SKU → 件/箱)
    pub case_sizes: HashMap<Sku, i64>,
}

// ==========================================
// LocationReconciler - 多门店对账引擎
// ==========================================
pub struct LocationReconciler {
    mapping: ColumnMapping,
    /// 采购单整体路由到的门店 (不拆分)
    po_destination: LocationCode,
    cleaner: DataCleaner,
}

impl LocationReconciler {
    /// 构造函数
    pub fn new(mapping: ColumnMapping, po_destination: LocationCode) -> Self {
        Self {
            mapping,
            po_destination,
            cleaner: DataCleaner,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行对账
    ///
    /// 目录主数据取自库存导出 (主文件);销售/调拨/采购按标准化 SKU
    /// 连接到主数据上。输出覆盖主数据中每个 SKU × 三家门店。
    ///
    /// # 返回
    /// (对账记录, 数据质量诊断计数)
    pub fn reconcile(
        &self,
        input: &ReconcileInput,
        sink: &dyn DiagnosticsSink,
    ) -> (Vec<ReconciledRecord>, ReconcileDiagnostics) {
        let mut diag = ReconcileDiagnostics::default();

        // === 1. 库存主数据: SKU → 按门店在库量 ===
        let stock_by_sku = self.aggregate_stock(&input.inventory_rows, &mut diag);

        // === 2. 销量: (SKU, 门店) → (销量, 最后售出日) ===
        let sales_by_key = self.aggregate_sales(&input.sales_rows, &mut diag, sink);

        // === 3. 调拨: (SKU, 门店) 的调入/调出合计 ===
        let (transfers_in, transfers_out) =
            self.aggregate_transfers(&input.transfers, &mut diag, sink);

        // === 4. 采购单: SKU 合计 ===
        let mut po_by_sku: HashMap<Sku, f64> = HashMap::new();
        for po in &input.purchase_orders {
            *po_by_sku.entry(po.sku.clone()).or_insert(0.0) += po.quantity.max(0.0);
        }

        // === 5. 汇总: 主数据 SKU × 门店 ===
        let mut records = Vec::new();
        for (sku, stock_by_loc) in &stock_by_sku {
            for location in LocationCode::STORES {
                let raw_stock = stock_by_loc.get(&location).copied().unwrap_or(0.0);
                let mut stock = raw_stock.round() as i64;
                if stock < 0 {
                    diag.negative_stock_clamped += 1;
                    sink.emit(DiagnosticLine::warning(format!(
                        "负在库量截断为 0: {} @ {} ({})",
                        sku, location, stock
                    )));
                    stock = 0;
                }

                let incoming = self.net_incoming(
                    sku,
                    location,
                    &po_by_sku,
                    &transfers_in,
                    &transfers_out,
                );

                let (units_sold, last_sale_date) = sales_by_key
                    .get(&(sku.clone(), location))
                    .map(|(qty, date)| (*qty, *date))
                    .unwrap_or((0.0, None));

                let case_size = input.case_sizes.get(sku).copied().unwrap_or(1).max(1);

                records.push(ReconciledRecord {
                    sku: sku.clone(),
                    location,
                    stock,
                    incoming,
                    units_sold,
                    last_sale_date,
                    case_size,
                });
            }
        }

        debug!(
            records = records.len(),
            invalid_sku = diag.invalid_sku_rows,
            unmapped = diag.unmapped_location_rows,
            "对账完成"
        );

        if diag.invalid_sku_rows > 0 {
            sink.emit(DiagnosticLine::warning(format!(
                "{} 行 SKU 无法标准化,已排除出连接",
                diag.invalid_sku_rows
            )));
        }

        (records, diag)
    }

    /// 净在途量: 路由采购单 + 调入 − 调出,下限 0
    ///
    /// 调出超过 (采购 + 调入) 时不得报负可用量,截断为 0
    fn net_incoming(
        &self,
        sku: &Sku,
        location: LocationCode,
        po_by_sku: &HashMap<Sku, f64>,
        transfers_in: &HashMap<(Sku, LocationCode), f64>,
        transfers_out: &HashMap<(Sku, LocationCode), f64>,
    ) -> i64 {
        let po_qty = if location == self.po_destination {
            po_by_sku.get(sku).copied().unwrap_or(0.0)
        } else {
            0.0
        };
        let inbound = transfers_in
            .get(&(sku.clone(), location))
            .copied()
            .unwrap_or(0.0);
        let outbound = transfers_out
            .get(&(sku.clone(), location))
            .copied()
            .unwrap_or(0.0);

        let net = po_qty + inbound - outbound;
        net.max(0.0).round() as i64
    }

    // ==========================================
    // 聚合 (库存 / 销量 / 调拨)
    // ==========================================

    /// 库存行聚合: SKU → {门店 → 在库量}
    ///
    /// 在库量 = 表头含门店名且含库存标记词的所有列之和 (货币式清洗);
    /// 同一 SKU 多行时累加
    fn aggregate_stock(
        &self,
        rows: &[RawRecord],
        diag: &mut ReconcileDiagnostics,
    ) -> BTreeMap<Sku, HashMap<LocationCode, f64>> {
        let mut result: BTreeMap<Sku, HashMap<LocationCode, f64>> = BTreeMap::new();

        for row in rows {
            let sku = match self.row_sku(row, &self.mapping.inventory_sku) {
                Some(sku) => sku,
                None => {
                    diag.invalid_sku_rows += 1;
                    continue;
                }
            };

            let per_loc = result.entry(sku).or_default();
            for location in LocationCode::STORES {
                let mut total = 0.0;
                for (header, value) in row {
                    if self.is_stock_column(header, location) {
                        total += self.cleaner.clean_currency(value);
                    }
                }
                *per_loc.entry(location).or_insert(0.0) += total;
            }
        }

        result
    }

    /// 判断表头是否为某门店的库存列
    fn is_stock_column(&self, header: &str, location: LocationCode) -> bool {
        header.contains(location.as_str())
            && STOCK_COLUMN_MARKERS.iter().any(|m| header.contains(m))
            && header != self.mapping.qty_sold
    }

    /// 销售行聚合: (SKU, 门店) → (销量合计, 最后售出日)
    fn aggregate_sales(
        &self,
        rows: &[RawRecord],
        diag: &mut ReconcileDiagnostics,
        sink: &dyn DiagnosticsSink,
    ) -> HashMap<(Sku, LocationCode), (f64, Option<NaiveDate>)> {
        let mut result: HashMap<(Sku, LocationCode), (f64, Option<NaiveDate>)> = HashMap::new();
        let mut unmapped_here = 0usize;

        for row in rows {
            let sku = match self.row_sku(row, &self.mapping.sku) {
                Some(sku) => sku,
                None => {
                    diag.invalid_sku_rows += 1;
                    continue;
                }
            };

            let location = row
                .get(&self.mapping.location)
                .map(|v| LocationCode::from_raw(v))
                .unwrap_or(LocationCode::Unmapped);
            if location == LocationCode::Unmapped {
                diag.unmapped_location_rows += 1;
                unmapped_here += 1;
            }

            let qty = row
                .get(&self.mapping.qty_sold)
                .map(|v| self.cleaner.clean_currency(v))
                .unwrap_or(0.0);

            let last_sold = row
                .get(&self.mapping.last_sold)
                .and_then(|v| self.cleaner.parse_date_lenient(v));

            let slot = result.entry((sku, location)).or_insert((0.0, None));
            slot.0 += qty;
            if let Some(date) = last_sold {
                slot.1 = Some(match slot.1 {
                    Some(existing) => existing.max(date),
                    None => date,
                });
            }
        }

        if unmapped_here > 0 {
            sink.emit(DiagnosticLine::warning(format!(
                "{} 行销售记录的门店无法归属",
                unmapped_here
            )));
        }

        result
    }

    /// 调拨聚合: 按 (SKU, 目的门店) 计调入,按 (SKU, 来源门店) 计调出
    fn aggregate_transfers(
        &self,
        transfers: &[TransferRecord],
        diag: &mut ReconcileDiagnostics,
        sink: &dyn DiagnosticsSink,
    ) -> (
        HashMap<(Sku, LocationCode), f64>,
        HashMap<(Sku, LocationCode), f64>,
    ) {
        let mut transfers_in: HashMap<(Sku, LocationCode), f64> = HashMap::new();
        let mut transfers_out: HashMap<(Sku, LocationCode), f64> = HashMap::new();

        for transfer in transfers {
            let qty = transfer.quantity.max(0.0);

            if transfer.dest_location == LocationCode::Unmapped
                || transfer.source_location == LocationCode::Unmapped
            {
                diag.unmapped_location_rows += 1;
                sink.emit(DiagnosticLine::warning(format!(
                    "调拨记录门店无法归属: {} {} → {}",
                    transfer.sku, transfer.source_location, transfer.dest_location
                )));
            }

            *transfers_in
                .entry((transfer.sku.clone(), transfer.dest_location))
                .or_insert(0.0) += qty;
            *transfers_out
                .entry((transfer.sku.clone(), transfer.source_location))
                .or_insert(0.0) += qty;
        }

        (transfers_in, transfers_out)
    }

    // ==========================================
    // 类型化加载 (原始行 → 记录)
    // ==========================================

    /// 调拨导出行 → 类型化调拨记录
    ///
    /// 行内缺来源/目的列时回退到文件级默认 (原始导出按"从中心店
    /// 发往某店"成文件组织,文件名即目的店)
    pub fn load_transfer_records(
        &self,
        rows: &[RawRecord],
        default_source: LocationCode,
        default_dest: LocationCode,
        diag: &mut ReconcileDiagnostics,
    ) -> Vec<TransferRecord> {
        let mut records = Vec::new();
        for row in rows {
            let sku = match self.row_sku(row, &self.mapping.sku) {
                Some(sku) => sku,
                None => {
                    diag.invalid_sku_rows += 1;
                    continue;
                }
            };

            let source = row
                .get(&self.mapping.source_location)
                .map(|v| LocationCode::from_raw(v))
                .unwrap_or(default_source);
            let dest = row
                .get(&self.mapping.dest_location)
                .map(|v| LocationCode::from_raw(v))
                .unwrap_or(default_dest);

            let quantity = row
                .get(&self.mapping.transfer_qty)
                .map(|v| self.cleaner.clean_currency(v))
                .unwrap_or(0.0)
                .max(0.0);

            records.push(TransferRecord {
                sku,
                source_location: source,
                dest_location: dest,
                quantity,
            });
        }
        records
    }

    /// 采购单导出行 → 类型化采购记录
    pub fn load_purchase_orders(
        &self,
        rows: &[RawRecord],
        diag: &mut ReconcileDiagnostics,
    ) -> Vec<PurchaseOrderRecord> {
        let mut records = Vec::new();
        for row in rows {
            let sku = match self.row_sku(row, &self.mapping.sku) {
                Some(sku) => sku,
                None => {
                    diag.invalid_sku_rows += 1;
                    continue;
                }
            };
            let quantity = row
                .get(&self.mapping.po_qty)
                .map(|v| self.cleaner.clean_currency(v))
                .unwrap_or(0.0)
                .max(0.0);
            records.push(PurchaseOrderRecord { sku, quantity });
        }
        records
    }

    /// 箱规参考行 → SKU → 件/箱 (重复 SKU 取首见,无效值回退 1)
    pub fn load_case_sizes(
        &self,
        rows: &[RawRecord],
        diag: &mut ReconcileDiagnostics,
    ) -> HashMap<Sku, i64> {
        let mut case_sizes = HashMap::new();
        for row in rows {
            let sku = match self.row_sku(row, &self.mapping.sku) {
                Some(sku) => sku,
                None => {
                    diag.invalid_sku_rows += 1;
                    continue;
                }
            };
            let size = row
                .get(&self.mapping.case_size)
                .map(|v| self.cleaner.clean_unit_count(v))
                .unwrap_or(1)
                .max(1);
            case_sizes.entry(sku).or_insert(size);
        }
        case_sizes
    }

    /// 行内 SKU 标准化
    fn row_sku(&self, row: &RawRecord, column: &str) -> Option<Sku> {
        Sku::parse(row.get(column).map(String::as_str).unwrap_or(""))
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoOpSink;

    fn raw_row(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn reconciler() -> LocationReconciler {
        LocationReconciler::new(ColumnMapping::default(), LocationCode::Jasper)
    }

    fn empty_input() -> ReconcileInput {
        ReconcileInput {
            inventory_rows: vec![],
            sales_rows: vec![],
            transfers: vec![],
            purchase_orders: vec![],
            case_sizes: HashMap::new(),
        }
    }

    fn find<'a>(
        records: &'a [ReconciledRecord],
        sku: &str,
        location: LocationCode,
    ) -> &'a ReconciledRecord {
        records
            .iter()
            .find(|r| r.sku.as_str() == sku && r.location == location)
            .expect("缺少对账记录")
    }

    #[test]
    fn test_stock_sums_tagged_columns_with_currency_cleaning() {
        let mut input = empty_input();
        input.inventory_rows = vec![raw_row(&[
            ("SKU", "CNB-1001"),
            ("Hill Sales Floor", "4"),
            ("Hill Storage", "1,200"),
            ("Valley Inventory", "(3)"),
            ("Jasper Storage", "7.0"),
            ("Wholesale Cost", "99"), // 无门店标记,不计入
        ])];

        let (records, diag) = reconciler().reconcile(&input, &NoOpSink);

        assert_eq!(records.len(), 3);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Hill).stock, 1204);
        // 负在库量截断为 0 并计数
        assert_eq!(find(&records, "CNB-1001", LocationCode::Valley).stock, 0);
        assert_eq!(diag.negative_stock_clamped, 1);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Jasper).stock, 7);
    }

    #[test]
    fn test_sales_grouped_by_normalized_location() {
        let mut input = empty_input();
        input.inventory_rows = vec![raw_row(&[("SKU", "CNB-1001")])];
        input.sales_rows = vec![
            raw_row(&[("SKU", "cnb-1001"), ("Quantity", "5"), ("Location", "Hill Street")]),
            raw_row(&[("SKU", "CNB-1001.0"), ("Quantity", "3"), ("Location", "hill")]),
            raw_row(&[("SKU", "CNB-1001"), ("Quantity", "2"), ("Location", "Valley")]),
        ];

        let (records, _diag) = reconciler().reconcile(&input, &NoOpSink);

        assert_eq!(find(&records, "CNB-1001", LocationCode::Hill).units_sold, 8.0);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Valley).units_sold, 2.0);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Jasper).units_sold, 0.0);
    }

    #[test]
    fn test_unmapped_sales_location_counted_not_merged() {
        let mut input = empty_input();
        input.inventory_rows = vec![raw_row(&[("SKU", "CNB-1001")])];
        input.sales_rows = vec![raw_row(&[
            ("SKU", "CNB-1001"),
            ("Quantity", "9"),
            ("Location", "Online Warehouse"),
        ])];

        let (records, diag) = reconciler().reconcile(&input, &NoOpSink);

        // 未归属门店的销量不落入任何门店
        for location in LocationCode::STORES {
            assert_eq!(find(&records, "CNB-1001", location).units_sold, 0.0);
        }
        assert_eq!(diag.unmapped_location_rows, 1);
    }

    #[test]
    fn test_invalid_sku_rows_excluded_and_counted() {
        let mut input = empty_input();
        input.inventory_rows = vec![
            raw_row(&[("SKU", "CNB-1001"), ("Hill Storage", "5")]),
            raw_row(&[("SKU", "---"), ("Hill Storage", "99")]),
        ];
        input.sales_rows = vec![raw_row(&[("SKU", ""), ("Quantity", "4"), ("Location", "Hill")])];

        let (records, diag) = reconciler().reconcile(&input, &NoOpSink);

        assert_eq!(records.len(), 3); // 只有一个有效 SKU
        assert_eq!(diag.invalid_sku_rows, 2);
    }

    #[test]
    fn test_incoming_po_routed_to_destination_minus_outbound() {
        let sku = Sku::parse("CNB-1001").unwrap();
        let mut input = empty_input();
        input.inventory_rows = vec![raw_row(&[("SKU", "CNB-1001")])];
        input.purchase_orders = vec![PurchaseOrderRecord {
            sku: sku.clone(),
            quantity: 24.0,
        }];
        input.transfers = vec![
            TransferRecord {
                sku: sku.clone(),
                source_location: LocationCode::Jasper,
                dest_location: LocationCode::Hill,
                quantity: 10.0,
            },
            TransferRecord {
                sku: sku.clone(),
                source_location: LocationCode::Jasper,
                dest_location: LocationCode::Valley,
                quantity: 6.0,
            },
        ];

        let (records, _diag) = reconciler().reconcile(&input, &NoOpSink);

        // Jasper: 24 (PO) − 10 − 6 = 8;Hill/Valley 各得调入量
        assert_eq!(find(&records, "CNB-1001", LocationCode::Jasper).incoming, 8);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Hill).incoming, 10);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Valley).incoming, 6);
    }

    #[test]
    fn test_incoming_clamped_at_zero() {
        let sku = Sku::parse("CNB-1001").unwrap();
        let mut input = empty_input();
        input.inventory_rows = vec![raw_row(&[("SKU", "CNB-1001")])];
        // 调出超过 PO + 调入 → 净在途不得为负
        input.transfers = vec![TransferRecord {
            sku,
            source_location: LocationCode::Jasper,
            dest_location: LocationCode::Hill,
            quantity: 50.0,
        }];

        let (records, _diag) = reconciler().reconcile(&input, &NoOpSink);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Jasper).incoming, 0);
    }

    #[test]
    fn test_case_size_defaults_to_one() {
        let mut input = empty_input();
        input.inventory_rows = vec![raw_row(&[("SKU", "CNB-1001")])];
        let (records, _diag) = reconciler().reconcile(&input, &NoOpSink);
        assert_eq!(find(&records, "CNB-1001", LocationCode::Hill).case_size, 1);
    }

    #[test]
    fn test_load_transfer_records_with_defaults() {
        let r = reconciler();
        let mut diag = ReconcileDiagnostics::default();
        // 行内无来源/目的列: 回退到文件级默认 (Jasper → Hill)
        let rows = vec![raw_row(&[("SKU", "CNB-1001"), ("Quantity", "12")])];
        let records =
            r.load_transfer_records(&rows, LocationCode::Jasper, LocationCode::Hill, &mut diag);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_location, LocationCode::Jasper);
        assert_eq!(records[0].dest_location, LocationCode::Hill);
        assert_eq!(records[0].quantity, 12.0);
    }

    #[test]
    fn test_load_case_sizes_first_seen_wins() {
        let r = reconciler();
        let mut diag = ReconcileDiagnostics::default();
        let rows = vec![
            raw_row(&[("SKU", "CNB-1001"), ("EachesPerCase", "12")]),
            raw_row(&[("SKU", "CNB-1001"), ("EachesPerCase", "24")]),
            raw_row(&[("SKU", "CNB-1002"), ("EachesPerCase", "bad")]),
        ];
        let sizes = r.load_case_sizes(&rows, &mut diag);

        assert_eq!(sizes[&Sku::parse("CNB-1001").unwrap()], 12);
        // 无效箱规回退 1
        assert_eq!(sizes[&Sku::parse("CNB-1002").unwrap()], 1);
    }

    #[test]
    fn test_last_sale_date_takes_latest() {
        let mut input = empty_input();
        input.inventory_rows = vec![raw_row(&[("SKU", "CNB-1001")])];
        input.sales_rows = vec![
            raw_row(&[
                ("SKU", "CNB-1001"),
                ("Quantity", "1"),
                ("Location", "Hill"),
                ("Last Sold", "2025-11-10"),
            ]),
            raw_row(&[
                ("SKU", "CNB-1001"),
                ("Quantity", "1"),
                ("Location", "Hill"),
                ("Last Sold", "2025-11-20"),
            ]),
        ];

        let (records, _diag) = reconciler().reconcile(&input, &NoOpSink);
        assert_eq!(
            find(&records, "CNB-1001", LocationCode::Hill).last_sale_date,
            Some(NaiveDate::from_ymd_opt(2025, 11, 20).unwrap())
        );
    }
}
