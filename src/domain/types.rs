// ==========================================
// 零售补货分析系统 - 领域类型定义
// ==========================================
// 职责: 核心枚举类型 (需求状态/产品类别/门店/趋势)
// 序列化格式: SCREAMING_SNAKE_CASE (与报表层一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 需求状态 (Status Tag)
// ==========================================
// 红线: 分层判定制,不是评分制 — 首个命中的层级胜出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusTag {
    New,     // 零销量但有到货 (新品落地)
    Cold,    // 零销量且有库存 (滞销观察)
    Hot,     // 高流速且库存充足
    Reorder, // 库存告急,需立即补货
    Good,    // 流速正常且覆盖充足
    Dead,    // 长期积压 (死库存)
    Minimal, // 无库存无需求
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl StatusTag {
    /// 转换为数据库/报表存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StatusTag::New => "NEW",
            StatusTag::Cold => "COLD",
            StatusTag::Hot => "HOT",
            StatusTag::Reorder => "REORDER",
            StatusTag::Good => "GOOD",
            StatusTag::Dead => "DEAD",
            StatusTag::Minimal => "MINIMAL",
        }
    }
}

// ==========================================
// 产品类别 (Product Class)
// ==========================================
// 红线: 由标准化 SKU 确定性派生,禁止按 SKU 单独配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductClass {
    Cannabis,  // 大麻类 (SKU 前缀约定)
    Accessory, // 配件类 (其余全部)
}

/// 大麻类 SKU 前缀约定
pub const CANNABIS_SKU_PREFIX: &str = "CNB-";

impl ProductClass {
    /// 从标准化 SKU 派生产品类别
    ///
    /// # 参数
    /// - `normalized_sku`: 已标准化的 SKU (大写/去空白)
    pub fn from_normalized_sku(normalized_sku: &str) -> Self {
        if normalized_sku.starts_with(CANNABIS_SKU_PREFIX) {
            ProductClass::Cannabis
        } else {
            ProductClass::Accessory
        }
    }
}

impl fmt::Display for ProductClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductClass::Cannabis => write!(f, "CANNABIS"),
            ProductClass::Accessory => write!(f, "ACCESSORY"),
        }
    }
}

// ==========================================
// 门店代码 (Location Code)
// ==========================================
// 封闭集合: Hill / Valley / Jasper
// 未识别值归入 Unmapped,必须以警告形式上报,不得静默丢弃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationCode {
    Hill,
    Valley,
    Jasper,
    Unmapped, // 无法归属的门店值
}

impl LocationCode {
    /// 全部实际门店 (不含 Unmapped)
    pub const STORES: [LocationCode; 3] =
        [LocationCode::Hill, LocationCode::Valley, LocationCode::Jasper];

    /// 从原始门店字符串标准化 (大小写不敏感的子串匹配)
    pub fn from_raw(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("hill") {
            LocationCode::Hill
        } else if lower.contains("valley") {
            LocationCode::Valley
        } else if lower.contains("jasper") {
            LocationCode::Jasper
        } else {
            LocationCode::Unmapped
        }
    }

    /// 门店显示名
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationCode::Hill => "Hill",
            LocationCode::Valley => "Valley",
            LocationCode::Jasper => "Jasper",
            LocationCode::Unmapped => "Unmapped",
        }
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 流速趋势 (Velocity Trend)
// ==========================================
// 由滚动窗口与前一等长窗口的对比得出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VelocityTrend {
    Growing,    // 增长 (> +25%)
    Declining,  // 下滑 (< -25%)
    Stable,     // 平稳
    NewSpiking, // 前窗无数据且当前窗为正
}

impl fmt::Display for VelocityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VelocityTrend::Growing => write!(f, "GROWING"),
            VelocityTrend::Declining => write!(f, "DECLINING"),
            VelocityTrend::Stable => write!(f, "STABLE"),
            VelocityTrend::NewSpiking => write!(f, "NEW_SPIKING"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_class_from_sku() {
        assert_eq!(
            ProductClass::from_normalized_sku("CNB-1234"),
            ProductClass::Cannabis
        );
        assert_eq!(
            ProductClass::from_normalized_sku("GRINDER-01"),
            ProductClass::Accessory
        );
        // 前缀必须位于开头
        assert_eq!(
            ProductClass::from_normalized_sku("XCNB-1234"),
            ProductClass::Accessory
        );
    }

    #[test]
    fn test_location_from_raw_substring() {
        assert_eq!(LocationCode::from_raw("Hill Street Store"), LocationCode::Hill);
        assert_eq!(LocationCode::from_raw("THE VALLEY"), LocationCode::Valley);
        assert_eq!(LocationCode::from_raw("jasper-02"), LocationCode::Jasper);
        assert_eq!(LocationCode::from_raw("Downtown"), LocationCode::Unmapped);
    }

    #[test]
    fn test_status_tag_display() {
        assert_eq!(StatusTag::Reorder.to_string(), "REORDER");
        assert_eq!(StatusTag::Minimal.to_db_str(), "MINIMAL");
    }
}
