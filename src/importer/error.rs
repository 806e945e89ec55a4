// ==========================================
// 零售补货分析系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 单个快照文件的失败只跳过该文件,批次继续
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件被占用,跳过: {0}")]
    FileLocked(String),

    // ===== 文件名约定错误 =====
    #[error("文件名未携带有效日期段 (需要两个 YYYY-MM-DD): {0}")]
    DateRangeMissing(String),

    // ===== 数据映射错误 =====
    #[error("字段映射失败 (列 {column}): {message}")]
    ColumnMappingError { column: String, message: String },

    #[error("快照无可用数据行: {0}")]
    EmptySnapshot(String),

    // ===== 并发控制错误 =====
    #[error("已有摄取批次在运行,历史库为单写者资源")]
    IngestInProgress,

    // ===== 存储错误 =====
    #[error("历史库写入失败: {0}")]
    StoreError(#[from] crate::repository::RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
