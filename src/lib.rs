// ==========================================
// 零售补货分析系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 多门店补货决策支持 (人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 销售历史库
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据与快照摄取
pub mod importer;

// 配置层 - 运行设置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 诊断流 - 进度/警告行
pub mod diagnostics;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LocationCode, ProductClass, StatusTag, VelocityTrend};

// 领域实体
pub use domain::{
    AnalysisReport, InventoryMetrics, PurchaseOrderRecord, ReconcileDiagnostics,
    ReconciledRecord, Sku, SkuAssessment, SnapshotRow, StatusRuleBook, StatusRules,
    TransferRecord,
};

// 引擎
pub use engine::{
    AnalysisOrchestrator, LocationReconciler, ReplenishmentPlanner, RollingVelocityEngine,
    StatusClassifier, VelocityModel,
};

// 摄取与仓储
pub use importer::{IngestSummary, SnapshotIngestor};
pub use repository::SalesHistoryRepository;

// 诊断
pub use diagnostics::{ChannelSink, DiagnosticLine, DiagnosticsSink, NoOpSink, TracingSink};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "零售补货分析系统";
