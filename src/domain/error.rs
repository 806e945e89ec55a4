// ==========================================
// 零售补货分析系统 - 领域层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 领域错误代表调用方契约违规,必须立即失败,不得静默纠正
// ==========================================

use thiserror::Error;

/// 领域层错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    // ===== 指标契约违规 =====
    #[error("库存量不能为负: {0}")]
    NegativeStock(i64),

    #[error("在途量不能为负: {0}")]
    NegativeIncoming(i64),

    #[error("销量不能为负: {0}")]
    NegativeUnitsSold(f64),

    #[error("报表窗口天数必须为正: {0}")]
    NonPositiveReportWindow(f64),

    // ===== 规则契约违规 =====
    #[error("规则阈值必须为正 (field={field}): {value}")]
    NonPositiveThreshold { field: &'static str, value: f64 },

    #[error("流速系数必须落在 (0, 1] 区间: {0}")]
    MultiplierOutOfRange(f64),
}

/// Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
