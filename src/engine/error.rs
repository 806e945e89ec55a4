// ==========================================
// 零售补货分析系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 契约违规立即失败;缺必填输入整次运行失败,不产出部分结果
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 调用方契约违规 =====
    #[error("流速不能为负: {0}")]
    NegativeVelocity(f64),

    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // ===== 运行级失败 (无部分输出) =====
    #[error("缺少必填输入: {0}")]
    MissingRequiredInput(&'static str),

    #[error("输入文件读取失败: {0}")]
    Input(#[from] crate::importer::ImportError),

    #[error("历史库访问失败: {0}")]
    History(#[from] crate::repository::RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
