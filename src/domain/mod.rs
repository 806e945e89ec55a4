// ==========================================
// 零售补货分析系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、校验规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod error;
pub mod metrics;
pub mod records;
pub mod sku;
pub mod types;

// 重导出核心类型
pub use error::{DomainError, DomainResult};
pub use metrics::{InventoryMetrics, StatusRuleBook, StatusRules};
pub use records::{
    AnalysisReport, PurchaseOrderRecord, ReconcileDiagnostics, ReconciledRecord, SkuAssessment,
    SnapshotRow, TransferRecord,
};
pub use sku::Sku;
pub use types::{
    LocationCode, ProductClass, StatusTag, VelocityTrend, CANNABIS_SKU_PREFIX,
};
