// ==========================================
// 零售补货分析系统 - 导入层
// ==========================================
// 职责: 外部导出文件 → 类型化记录;历史快照摄取管道
// 红线: 松散类型的文件解析全部隔离在本层,引擎只见类型化值
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod snapshot_ingestor;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::SnapshotFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, RawRecord, UniversalFileParser};
pub use snapshot_ingestor::{IngestSummary, SnapshotIngestor};
