// ==========================================
// 零售补货分析系统 - 需求状态分类引擎
// ==========================================
// 职责: (流速, 库存, 在途, 阈值, 产品类别) → 七态需求标签
// 红线: 纯函数判定,同输入必同输出,无 I/O
// 红线: 分层自上而下,首个命中层级胜出;边界比较方向
//       (≥ / < / >) 为刻意不对称,不得"统一化"
// ==========================================

use crate::domain::metrics::{InventoryMetrics, StatusRules};
use crate::domain::types::{ProductClass, StatusTag};
use crate::engine::error::EngineResult;
use crate::engine::velocity::{VelocityModel, DEFAULT_SILENCE_THRESHOLD};

// ==========================================
// StatusClassifier - 需求状态分类引擎
// ==========================================
pub struct StatusClassifier {
    velocity_model: VelocityModel,
}

impl StatusClassifier {
    /// 构造函数
    pub fn new() -> Self {
        Self {
            velocity_model: VelocityModel::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 从指标判定需求状态 (流速由指标现算,不含历史融合)
    pub fn determine_status(
        &self,
        metrics: &InventoryMetrics,
        class: ProductClass,
        rules: &StatusRules,
    ) -> EngineResult<StatusTag> {
        let velocity = self.velocity_model.compute_velocity(metrics);
        self.classify(velocity, metrics.stock, metrics.incoming, class, rules)
    }

    /// 按给定流速判定需求状态
    ///
    /// 历史融合后的流速由调用方传入;`wos` 始终用"仅在库" (在途记 0)
    /// 口径判断紧急程度,"有效覆盖周数"才把在途计入,用来判断缺口
    /// 是否已被在途补齐。
    ///
    /// # 参数
    /// - `velocity`: 流速 (件/周),非负 (负值为调用方契约违规)
    /// - `stock` / `incoming`: 对账后的在库/在途量
    /// - `class`: 产品类别 (选择判定变体)
    /// - `rules`: 该类别的阈值集
    pub fn classify(
        &self,
        velocity: f64,
        stock: i64,
        incoming: i64,
        class: ProductClass,
        rules: &StatusRules,
    ) -> EngineResult<StatusTag> {
        let effective_oh = stock.max(0);

        // 仅在库口径 (在途记 0)
        let wos = self.velocity_model.compute_effective_wos(
            effective_oh,
            0,
            velocity,
            DEFAULT_SILENCE_THRESHOLD,
        )?;
        // 在库 + 在途口径
        let effective_wos = self.velocity_model.compute_effective_wos(
            effective_oh,
            incoming,
            velocity,
            DEFAULT_SILENCE_THRESHOLD,
        )?;

        match class {
            ProductClass::Cannabis => {
                Ok(self.classify_cannabis(velocity, effective_oh, incoming, wos, effective_wos, rules))
            }
            ProductClass::Accessory => {
                Ok(self.classify_accessory(velocity, effective_oh, wos, rules))
            }
        }
    }

    // ==========================================
    // 大麻类五层判定 (基准行为)
    // ==========================================

    fn classify_cannabis(
        &self,
        velocity: f64,
        effective_oh: i64,
        incoming: i64,
        wos: f64,
        effective_wos: f64,
        rules: &StatusRules,
    ) -> StatusTag {
        // === 第 1 层: 零流速 ===
        if velocity == 0.0 {
            if incoming > 0 {
                return StatusTag::New; // 有到货,需求未起
            } else if effective_oh > 0 {
                return StatusTag::Cold; // 有库存,无销售
            }
            return StatusTag::Minimal; // 无库存,无需求
        }

        // === 第 2 层: 高流速 ===
        if velocity >= rules.hot_velocity {
            if wos < rules.reorder_point {
                // 在库覆盖不足,看在途能否补齐缺口
                if effective_wos >= rules.reorder_point {
                    return StatusTag::Good; // 在途覆盖缺口
                }
                return StatusTag::Reorder; // 告急,必须补货
            }
            return StatusTag::Hot; // 高流速且库存充足
        }

        // === 第 3 层: 中流速 ===
        let good_vel_threshold = rules.hot_velocity * rules.good_velocity_multiplier;
        if velocity >= good_vel_threshold {
            if wos < rules.reorder_point {
                if effective_wos >= rules.reorder_point {
                    return StatusTag::Good;
                }
                return StatusTag::Reorder;
            }
            return StatusTag::Good; // 流速平稳,库存充足
        }

        // === 第 4 层: 低流速 (死库存) ===
        if wos > rules.dead_wos && effective_oh > rules.dead_on_hand {
            return StatusTag::Dead;
        }

        // === 第 5 层: 兜底 ===
        StatusTag::Minimal
    }

    // ==========================================
    // 配件类简化判定
    // ==========================================

    fn classify_accessory(
        &self,
        velocity: f64,
        effective_oh: i64,
        wos: f64,
        rules: &StatusRules,
    ) -> StatusTag {
        if velocity == 0.0 {
            if effective_oh > 0 {
                return StatusTag::Cold;
            }
            return StatusTag::Minimal;
        }
        // 配件热销门槛用严格大于 (历史口径,保持不变)
        if velocity > rules.hot_velocity {
            return StatusTag::Hot;
        }
        if wos < rules.reorder_point {
            return StatusTag::Reorder;
        }
        StatusTag::Good
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new()
    }
}
