// ==========================================
// 零售补货分析系统 - 销售流速引擎
// ==========================================
// 职责: 周流速计算 (断货修正) + 覆盖周数 + 历史流速融合
// 输入: InventoryMetrics (+ 可选的历史滚动流速)
// 输出: 流速 (件/周) / 覆盖周数 (周)
// ==========================================

use crate::domain::metrics::InventoryMetrics;
use crate::engine::error::{EngineError, EngineResult};

/// 流速为零时覆盖周数的哨兵值 ("无限跑道",避免除零)
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 999.0;

// ==========================================
// VelocityModel - 销售流速引擎
// ==========================================
pub struct VelocityModel {
    // 无状态引擎,不需要注入依赖
}

impl VelocityModel {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算周流速 (件/周),含断货修正
    ///
    /// 有效期默认为整个报表窗口;当 `stock == 0` 且存在最后售出日期时,
    /// 有效期缩短为 `max(1, 窗口起始日 → 最后售出日的天数)`,
    /// 且不超过窗口长度 —— 商品在窗口结束前已售罄,
    /// 不应让断货后的静默期稀释其流速。
    ///
    /// # 返回
    /// 流速 (件/周),非负;有效期为零时返回 0
    pub fn compute_velocity(&self, metrics: &InventoryMetrics) -> f64 {
        let mut period_days = metrics.report_window_days;

        if metrics.stock == 0 {
            if let Some(last_sale) = metrics.last_sale_date {
                let days_until_last_sale = last_sale
                    .signed_duration_since(metrics.report_start_date)
                    .num_days() as f64;
                // 下限 1 天防止除零与负天数
                period_days = days_until_last_sale.max(1.0);
                // 上限为窗口长度 (理论上不会超出,防御数据异常)
                period_days = period_days.min(metrics.report_window_days);
            }
        }

        let weeks = period_days / 7.0;
        if weeks > 0.0 {
            metrics.total_units_sold / weeks
        } else {
            0.0
        }
    }

    /// 计算覆盖周数 (WOS)
    ///
    /// # 参数
    /// - `stock`: 在库量 (负值按 0 计)
    /// - `incoming`: 在途量;传 0 得到"仅在库"口径
    /// - `velocity`: 流速 (件/周)
    /// - `silence_threshold`: 流速为零时返回的哨兵值
    ///
    /// # 返回
    /// - 覆盖周数;流速为零时恒为哨兵值
    /// - Err(EngineError::NegativeVelocity): 调用方契约违规
    pub fn compute_effective_wos(
        &self,
        stock: i64,
        incoming: i64,
        velocity: f64,
        silence_threshold: f64,
    ) -> EngineResult<f64> {
        if velocity < 0.0 {
            return Err(EngineError::NegativeVelocity(velocity));
        }
        if velocity == 0.0 {
            return Ok(silence_threshold);
        }

        let total_available = (stock.max(0) + incoming) as f64;
        Ok(total_available / velocity)
    }

    /// 历史流速融合
    ///
    /// 历史库给出的滚动流速严格为正时覆盖本次运行的流速,
    /// 让老品反映更长更稳的基线;无历史的新品回落到单次运行估计。
    pub fn blend_with_history(&self, current: f64, rolling: f64) -> f64 {
        if rolling > 0.0 {
            rolling
        } else {
            current
        }
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for VelocityModel {
    fn default() -> Self {
        Self::new()
    }
}
