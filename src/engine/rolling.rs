// ==========================================
// 零售补货分析系统 - 滚动流速引擎
// ==========================================
// 职责: 基于历史库的滚动窗口流速与趋势判定
// 输入: 销售历史库 + (SKU, 门店, 基准日, 窗口周数)
// 输出: 当前窗口流速 / 前一窗口流速 / 趋势
// ==========================================

use crate::domain::sku::Sku;
use crate::domain::types::{LocationCode, VelocityTrend};
use crate::engine::error::EngineResult;
use crate::repository::SalesHistoryRepository;
use chrono::{Duration, NaiveDate};

/// 趋势判定阈值: 变化幅度超过 ±25% 才视为增长/下滑
const TREND_CHANGE_THRESHOLD: f64 = 0.25;

// ==========================================
// RollingVelocity - 滚动流速结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingVelocity {
    /// 当前窗口流速 (件/周)
    pub velocity: f64,
    /// 前一等长窗口流速 (件/周)
    pub prior_velocity: f64,
    /// 趋势
    pub trend: VelocityTrend,
}

// ==========================================
// RollingVelocityEngine - 滚动流速引擎
// ==========================================
pub struct RollingVelocityEngine {
    // 无状态引擎,历史库由调用方传入
}

impl RollingVelocityEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算滚动流速与趋势
    ///
    /// 当前窗口为 (基准日 - 窗口, 基准日],前一窗口为等长紧邻区间,
    /// 两窗口不重叠、不重复计数。各窗口销量求和后除以窗口周数。
    ///
    /// 趋势规则:
    /// - 增幅 > +25% → Growing
    /// - 降幅 < -25% → Declining
    /// - 前窗无数据且当前窗为正 → NewSpiking
    /// - 其余 → Stable
    ///
    /// # 参数
    /// - `store`: 销售历史库
    /// - `sku` / `location`: 查询键
    /// - `as_of_date`: 基准日
    /// - `window_weeks`: 窗口长度 (周),非正时按 1 周处理
    pub fn compute(
        &self,
        store: &SalesHistoryRepository,
        sku: &Sku,
        location: LocationCode,
        as_of_date: NaiveDate,
        window_weeks: i64,
    ) -> EngineResult<RollingVelocity> {
        let weeks = window_weeks.max(1);
        let window_days = weeks * 7;

        let current_start = as_of_date - Duration::days(window_days);
        let prior_start = as_of_date - Duration::days(window_days * 2);

        let current_sum =
            store.sum_quantity_in_window(sku, location, current_start, as_of_date)?;
        let prior_sum =
            store.sum_quantity_in_window(sku, location, prior_start, current_start)?;

        let velocity = current_sum / weeks as f64;
        let prior_velocity = prior_sum / weeks as f64;
        let trend = self.classify_trend(velocity, prior_velocity);

        Ok(RollingVelocity {
            velocity,
            prior_velocity,
            trend,
        })
    }

    /// 趋势判定 (纯函数)
    fn classify_trend(&self, current: f64, prior: f64) -> VelocityTrend {
        if prior > 0.0 {
            let pct_change = (current - prior) / prior;
            if pct_change > TREND_CHANGE_THRESHOLD {
                VelocityTrend::Growing
            } else if pct_change < -TREND_CHANGE_THRESHOLD {
                VelocityTrend::Declining
            } else {
                VelocityTrend::Stable
            }
        } else if current > 0.0 {
            // 前窗无数据,当前窗为正
            VelocityTrend::NewSpiking
        } else {
            VelocityTrend::Stable
        }
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for RollingVelocityEngine {
    fn default() -> Self {
        Self::new()
    }
}
