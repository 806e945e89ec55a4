// ==========================================
// 零售补货分析系统 - 流转记录与输出实体
// ==========================================
// 职责: 调拨/采购/销售快照记录与引擎输出行
// 红线: 记录进入引擎前必须已类型化,引擎不解析原始文本
// ==========================================

use crate::domain::sku::Sku;
use crate::domain::types::{LocationCode, ProductClass, StatusTag, VelocityTrend};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// TransferRecord - 门店间调拨记录
// ==========================================
/// 一笔门店间库存调拨
///
/// 按 (sku, source) 聚合得到调出量,按 (sku, dest) 聚合得到调入量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub sku: Sku,
    pub source_location: LocationCode,
    pub dest_location: LocationCode,
    /// 调拨数量 (件),非负
    pub quantity: f64,
}

// ==========================================
// PurchaseOrderRecord - 采购单记录
// ==========================================
/// 一笔采购单量,整体路由到本次运行配置的目的门店 (不拆分)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderRecord {
    pub sku: Sku,
    /// 已下单数量 (件),非负
    pub quantity: f64,
}

// ==========================================
// SnapshotRow - 历史销售快照行
// ==========================================
/// 销售历史库中的一行: (SKU, 门店, 报表截止日) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub sku: Sku,
    pub location: LocationCode,
    /// 快照所覆盖日期段的截止日 (来自文件名)
    pub report_end_date: NaiveDate,
    /// 该期间售出数量 (件)
    pub quantity_sold: f64,
    /// 该期间净销售额 (可选,货币清洗后)
    pub net_sales: Option<f64>,
}

// ==========================================
// ReconciledRecord - 对账结果
// ==========================================
/// LocationReconciler 输出: 单个 (SKU, 门店) 的对账三元组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub sku: Sku,
    pub location: LocationCode,
    /// 在库量 (件,已截断为非负)
    pub stock: i64,
    /// 净在途量 (件,下限 0)
    pub incoming: i64,
    /// 窗口内销量 (件)
    pub units_sold: f64,
    /// 最后售出日期 (销售数据带日期列时填充)
    pub last_sale_date: Option<NaiveDate>,
    /// 整箱规格 (件/箱,下限 1)
    pub case_size: i64,
}

// ==========================================
// SkuAssessment - 引擎输出行
// ==========================================
/// 单个 (SKU, 门店) 的评估结论,交由外部报表渲染方消费
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuAssessment {
    pub sku: Sku,
    pub product_class: ProductClass,
    pub location: LocationCode,
    pub status: StatusTag,
    /// 建议订货量 (件,整箱对齐)
    pub suggested_order_qty: i64,
    /// 流速 (件/周,可能被历史滚动流速覆盖)
    pub velocity: f64,
    /// 覆盖周数 (仅在库,不含在途)
    pub weeks_of_stock: f64,
    pub stock: i64,
    pub incoming: i64,
    pub units_sold: f64,
    pub case_size: i64,
    /// 历史趋势 (历史库可用时填充)
    pub trend: Option<VelocityTrend>,
}

// ==========================================
// AnalysisReport - 分析运行结果
// ==========================================
/// 一次分析运行的完整输出: 要么整体成功,要么无输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// 运行标识
    pub run_id: String,
    /// 生成时间
    pub generated_at: DateTime<Utc>,
    /// 分析窗口长度 (天)
    pub report_window_days: f64,
    /// 评估行 (按 SKU、门店排序)
    pub rows: Vec<SkuAssessment>,
    /// 数据质量诊断汇总
    pub diagnostics: ReconcileDiagnostics,
}

// ==========================================
// ReconcileDiagnostics - 数据质量诊断汇总
// ==========================================
/// 对账过程中恢复掉的数据质量问题计数
///
/// 这些问题以安全默认值就地恢复并上报警告,从不中断运行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileDiagnostics {
    /// SKU 无法标准化而被排除的行数
    pub invalid_sku_rows: usize,
    /// 门店无法归属 (Unmapped) 的行数
    pub unmapped_location_rows: usize,
    /// 在库量为负被截断为 0 的 (SKU, 门店) 数
    pub negative_stock_clamped: usize,
}

impl ReconcileDiagnostics {
    /// 合并另一份诊断计数
    pub fn merge(&mut self, other: &ReconcileDiagnostics) {
        self.invalid_sku_rows += other.invalid_sku_rows;
        self.unmapped_location_rows += other.unmapped_location_rows;
        self.negative_stock_clamped += other.negative_stock_clamped;
    }
}
