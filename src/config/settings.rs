// ==========================================
// 零售补货分析系统 - 运行设置
// ==========================================
// 职责: 设置文件加载/保存,默认值
// 存储: JSON 设置文件;缺失或损坏时回退默认并告警
// 红线: 阈值在此一次性转为不可变值对象,显式传入各组件,
//       管道内部不读任何共享可变配置
// ==========================================

use crate::domain::metrics::StatusRuleBook;
use crate::domain::types::LocationCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

// ==========================================
// ColumnMapping - 源列名映射表
// ==========================================
/// 源导出文件列名 → 规范字段
///
/// 不同 POS 导出的列名不一致,通过映射表对齐,引擎只认规范字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub sku: String,
    pub description: String,
    pub qty_sold: String,
    pub net_sales: String,
    pub gross_sales: String,
    pub profit: String,
    pub inventory_sku: String,
    pub location: String,
    pub last_sold: String,
    pub source_location: String,
    pub dest_location: String,
    pub transfer_qty: String,
    pub po_qty: String,
    pub case_size: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            sku: "SKU".to_string(),
            description: "Product Name".to_string(),
            qty_sold: "Quantity".to_string(),
            net_sales: "Net sales".to_string(),
            gross_sales: "Gross sales".to_string(),
            profit: "Profit".to_string(),
            inventory_sku: "SKU".to_string(),
            location: "Location".to_string(),
            last_sold: "Last Sold".to_string(),
            source_location: "Source Location".to_string(),
            dest_location: "Destination Location".to_string(),
            transfer_qty: "Quantity".to_string(),
            po_qty: "Quantity".to_string(),
            case_size: "EachesPerCase".to_string(),
        }
    }
}

// ==========================================
// AnalysisSettings - 分析运行设置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// 两套判定阈值 (大麻类/配件类)
    pub rules: StatusRuleBook,
    /// 源列名映射
    pub column_mapping: ColumnMapping,
    /// 分析窗口长度 (天)
    pub report_window_days: f64,
    /// 采购单整体路由到的门店
    pub po_destination: LocationCode,
    /// 配件类走人工订货渠道,SOQ 强制为 0 (策略开关,非公式变更)
    pub accessory_manual_ordering: bool,
    /// 历史滚动流速窗口 (周)
    pub rolling_window_weeks: i64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            rules: StatusRuleBook::default(),
            column_mapping: ColumnMapping::default(),
            report_window_days: 30.0,
            po_destination: LocationCode::Jasper,
            accessory_manual_ordering: true,
            rolling_window_weeks: 4,
        }
    }
}

// ==========================================
// IngestSettings - 快照摄取设置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// 快照收件目录;缺省为系统下载目录
    pub inbox_dir: Option<PathBuf>,
    /// 历史库根目录 (数据库与归档所在)
    pub store_dir: PathBuf,
    /// 快照文件名前缀过滤,避免误触其他下载文件
    pub filename_prefix: String,
}

impl IngestSettings {
    /// 历史库数据库文件路径
    pub fn store_db_path(&self) -> PathBuf {
        self.store_dir.join("sales_history.db")
    }

    /// 已合并快照的归档目录
    pub fn archive_dir(&self) -> PathBuf {
        self.store_dir.join("Archive")
    }

    /// 实际生效的收件目录 (设置缺省时落到系统下载目录)
    pub fn effective_inbox(&self) -> PathBuf {
        match &self.inbox_dir {
            Some(dir) => dir.clone(),
            None => dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            inbox_dir: None,
            store_dir: default_store_dir(),
            filename_prefix: "product-sales".to_string(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retail-replenish")
}

// ==========================================
// InputPaths - 分析输入文件清单
// ==========================================
/// 一次分析运行的输入文件
///
/// 库存与销售导出为必填;其余可选,缺失时以安全默认参与对账
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub inventory: Option<PathBuf>,
    pub sales: Option<PathBuf>,
    pub purchase_orders: Option<PathBuf>,
    pub transfers: Vec<PathBuf>,
    /// 整箱规格参考表 (SKU → 件/箱)
    pub case_reference: Option<PathBuf>,
}

// ==========================================
// AppSettings - 顶层设置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub analysis: AnalysisSettings,
    pub ingest: IngestSettings,
    pub inputs: InputPaths,
}

impl AppSettings {
    /// 从 JSON 设置文件加载
    ///
    /// 文件缺失或损坏时回退默认设置并告警 (不中断)
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<AppSettings>(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "设置文件损坏,回退默认设置");
                    AppSettings::default()
                }
            },
            Err(_) => {
                warn!(path = %path.display(), "设置文件不存在,使用默认设置");
                AppSettings::default()
            }
        }
    }

    /// 保存为 JSON 设置文件
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}
