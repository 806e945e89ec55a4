// ==========================================
// 零售补货分析系统 - SKU 标准化
// ==========================================
// 职责: 原始 SKU 值 → 标准化键
// 规则: TRIM / UPPER / 去浮点尾巴 ".0" / 至少一个字母数字
// 红线: 无法标准化的 SKU 排除出主数据连接,计入诊断统计
// ==========================================

use crate::domain::types::ProductClass;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 标准化后的 SKU 键
///
/// 构造只能通过 [`Sku::parse`] 完成,保证不变式:
/// 大写、无首尾空白、无 ".0" 浮点尾巴、至少一个字母数字字符
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    /// 标准化原始 SKU 值
    ///
    /// # 返回
    /// - `Some(Sku)`: 标准化成功
    /// - `None`: 无有效内容 ("no value"),调用方应排除该行并计数
    pub fn parse(raw: &str) -> Option<Self> {
        let mut value = raw.trim().to_uppercase();

        // 电子表格常见的浮点伪迹: "1234.0" → "1234"
        if value.ends_with(".0") {
            value.truncate(value.len() - 2);
        }

        // 至少包含一个字母数字字符才视为有效键
        if value.chars().any(|c| c.is_ascii_alphanumeric()) {
            Some(Sku(value))
        } else {
            None
        }
    }

    /// 标准化键的字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 派生产品类别 (见 [`ProductClass::from_normalized_sku`])
    pub fn product_class(&self) -> ProductClass {
        ProductClass::from_normalized_sku(&self.0)
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
