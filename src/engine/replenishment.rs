// ==========================================
// 零售补货分析系统 - 补货量引擎
// ==========================================
// 职责: 建议订货量 (SOQ) 计算,整箱对齐
// 公式: ceil(max(流速×目标周数 − 在库 − 在途, 0) / 箱规) × 箱规
// 策略: 配件类可整体走人工订货渠道 (SOQ 强制 0,开关控制,非公式变更)
// ==========================================

use crate::domain::metrics::{InventoryMetrics, StatusRules};
use crate::domain::types::ProductClass;
use crate::engine::velocity::VelocityModel;

// ==========================================
// ReplenishmentPlanner - 补货量引擎
// ==========================================
pub struct ReplenishmentPlanner {
    /// 配件类走人工订货渠道时,其 SOQ 恒为 0
    suppress_accessory_orders: bool,
    velocity_model: VelocityModel,
}

impl ReplenishmentPlanner {
    /// 构造函数
    ///
    /// # 参数
    /// - `suppress_accessory_orders`: 配件类人工订货策略开关
    pub fn new(suppress_accessory_orders: bool) -> Self {
        Self {
            suppress_accessory_orders,
            velocity_model: VelocityModel::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 从指标计算 SOQ (流速由指标现算)
    pub fn calculate_soq(
        &self,
        metrics: &InventoryMetrics,
        rules: &StatusRules,
        case_size: i64,
    ) -> i64 {
        let velocity = self.velocity_model.compute_velocity(metrics);
        self.calculate_soq_with_velocity(velocity, metrics.stock, metrics.incoming, rules, case_size)
    }

    /// 按给定流速计算 SOQ (件,整箱倍数,永不为负/半箱)
    ///
    /// # 参数
    /// - `velocity`: 流速 (件/周),历史融合后的值由调用方传入
    /// - `case_size`: 箱规 (件/箱),下限 1
    pub fn calculate_soq_with_velocity(
        &self,
        velocity: f64,
        stock: i64,
        incoming: i64,
        rules: &StatusRules,
        case_size: i64,
    ) -> i64 {
        let target_stock = velocity * rules.target_wos;
        let net_need = target_stock - (stock + incoming) as f64;

        if net_need <= 0.0 {
            return 0;
        }

        let case = case_size.max(1);
        let cases_needed = (net_need / case as f64).ceil() as i64;
        cases_needed * case
    }

    /// 按产品类别计算 SOQ (套用人工订货策略)
    pub fn plan_order(
        &self,
        velocity: f64,
        stock: i64,
        incoming: i64,
        class: ProductClass,
        rules: &StatusRules,
        case_size: i64,
    ) -> i64 {
        if class == ProductClass::Accessory && self.suppress_accessory_orders {
            return 0;
        }
        self.calculate_soq_with_velocity(velocity, stock, incoming, rules, case_size)
    }
}

impl Default for ReplenishmentPlanner {
    fn default() -> Self {
        Self::new(true)
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rules(target_wos: f64) -> StatusRules {
        StatusRules {
            hot_velocity: 2.0,
            reorder_point: 2.5,
            target_wos,
            dead_wos: 26.0,
            dead_on_hand: 5,
            good_velocity_multiplier: 0.25,
        }
    }

    fn planner() -> ReplenishmentPlanner {
        ReplenishmentPlanner::new(true)
    }

    #[test]
    fn test_soq_reference_scenario() {
        // 目标 4 周 × 2 件/周 = 8;净缺口 8 - 3 = 5;箱规 5 → 整 1 箱 = 5 件
        let soq = planner().calculate_soq_with_velocity(2.0, 3, 0, &rules(4.0), 5);
        assert_eq!(soq, 5);
    }

    #[test]
    fn test_soq_rounds_up_to_next_case() {
        // 净缺口 5,箱规 4 → 2 箱 = 8 件 (严格为缺口之上最近的整箱)
        let soq = planner().calculate_soq_with_velocity(2.0, 3, 0, &rules(4.0), 4);
        assert_eq!(soq, 8);
    }

    #[test]
    fn test_soq_exact_multiple_stays_exact() {
        // 净缺口 8 正好是箱规 4 的倍数 → soq == 净缺口
        let soq = planner().calculate_soq_with_velocity(2.0, 0, 0, &rules(4.0), 4);
        assert_eq!(soq, 8);
    }

    #[test]
    fn test_soq_zero_when_covered() {
        // 在库 + 在途 ≥ 目标 → 0
        let soq = planner().calculate_soq_with_velocity(2.0, 5, 5, &rules(4.0), 5);
        assert_eq!(soq, 0);
    }

    #[test]
    fn test_soq_incoming_reduces_need() {
        // 目标 8,在库 3 + 在途 2 → 缺口 3,箱规 5 → 1 箱
        let soq = planner().calculate_soq_with_velocity(2.0, 3, 2, &rules(4.0), 5);
        assert_eq!(soq, 5);
    }

    #[test]
    fn test_soq_zero_velocity_orders_nothing() {
        let soq = planner().calculate_soq_with_velocity(0.0, 0, 0, &rules(4.0), 5);
        assert_eq!(soq, 0);
    }

    #[test]
    fn test_soq_case_size_floor_at_one() {
        // 非法箱规按 1 处理
        let soq = planner().calculate_soq_with_velocity(2.0, 3, 0, &rules(4.0), 0);
        assert_eq!(soq, 5);
    }

    #[test]
    fn test_accessory_policy_forces_zero() {
        let p = planner();
        // 同样的缺口,配件类被策略压为 0
        let acc = p.plan_order(2.0, 3, 0, ProductClass::Accessory, &rules(4.0), 5);
        assert_eq!(acc, 0);
        let can = p.plan_order(2.0, 3, 0, ProductClass::Cannabis, &rules(4.0), 5);
        assert_eq!(can, 5);

        // 策略关闭时配件类照常计算
        let p_off = ReplenishmentPlanner::new(false);
        let acc = p_off.plan_order(2.0, 3, 0, ProductClass::Accessory, &rules(4.0), 5);
        assert_eq!(acc, 5);
    }

    #[test]
    fn test_calculate_soq_from_metrics() {
        let p = planner();
        // 30 天卖 60 件 → 14 件/周;目标 4 周 = 56;在库 6 → 缺口 50;箱规 12 → 60
        let metrics = InventoryMetrics::new(
            6,
            0,
            60.0,
            30.0,
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            None,
        )
        .unwrap();
        let soq = p.calculate_soq(&metrics, &rules(4.0), 12);
        assert_eq!(soq, 60);
    }
}
