// ==========================================
// 零售补货分析系统 - 数据清洗器
// ==========================================
// 职责: 货币/数值单元格清洗、日期解析、文本标准化
// 约定: 单元格清洗永不报错,无法解析的值回退为 0 (数据质量问题,非致命)
// ==========================================

use chrono::NaiveDate;

pub struct DataCleaner;

impl DataCleaner {
    /// 货币式数值清洗
    ///
    /// 规则:
    /// - 去除千分位分隔符与货币符号
    /// - 括号记账负数: "(1,234.56)" → -1234.56
    /// - 无法解析的值回退为 0.0,永不报错
    pub fn clean_currency(&self, value: &str) -> f64 {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return 0.0;
        }

        // 括号记账负数
        let (body, parenthesized) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')'))
        {
            Some(inner) => (inner, true),
            None => (trimmed, false),
        };

        // 仅保留数字、小数点与负号
        let cleaned: String = body
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();

        match cleaned.parse::<f64>() {
            Ok(v) if parenthesized => -v,
            Ok(v) => v,
            Err(_) => 0.0,
        }
    }

    /// 货币式清洗后取非负整数件数 (四舍五入)
    pub fn clean_unit_count(&self, value: &str) -> i64 {
        self.clean_currency(value).round() as i64
    }

    /// 文本清洗 (TRIM,可选 UPPER)
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// 空值标准化: 空白字符串视为缺失
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 宽松日期解析 (销售导出常见格式)
    ///
    /// 依次尝试: YYYY-MM-DD / YYYYMMDD / MM/DD/YYYY
    pub fn parse_date_lenient(&self, value: &str) -> Option<NaiveDate> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
            .ok()
    }
}
