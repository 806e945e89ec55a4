// ==========================================
// 零售补货分析系统 - 库存指标与状态规则
// ==========================================
// 职责: 每次分析运行中单个 (SKU, 门店) 的不可变指标容器
//       以及按产品类别划分的判定阈值集
// 红线: 构造期校验,负值/非正窗口立即失败 (调用方缺陷,不可恢复)
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::types::ProductClass;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// InventoryMetrics - 库存指标
// ==========================================
/// 单个 (SKU, 门店) 在一次分析运行中的对账结果
///
/// 由 LocationReconciler 构造一次,之后只读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMetrics {
    /// 当前在库量 (件)
    pub stock: i64,
    /// 净在途量 (件): 采购单 + 调入 - 调出,下限 0
    pub incoming: i64,
    /// 报表窗口内总销量 (件)
    pub total_units_sold: f64,
    /// 报表窗口长度 (天)
    pub report_window_days: f64,
    /// 报表窗口起始日期
    pub report_start_date: NaiveDate,
    /// 最后一次售出日期 (无销售记录时为空)
    pub last_sale_date: Option<NaiveDate>,
}

impl InventoryMetrics {
    /// 构造并校验库存指标
    ///
    /// # 返回
    /// - `Err(DomainError)`: 契约违规 (负库存/负在途/负销量/非正窗口)
    pub fn new(
        stock: i64,
        incoming: i64,
        total_units_sold: f64,
        report_window_days: f64,
        report_start_date: NaiveDate,
        last_sale_date: Option<NaiveDate>,
    ) -> DomainResult<Self> {
        if stock < 0 {
            return Err(DomainError::NegativeStock(stock));
        }
        if incoming < 0 {
            return Err(DomainError::NegativeIncoming(incoming));
        }
        if total_units_sold < 0.0 {
            return Err(DomainError::NegativeUnitsSold(total_units_sold));
        }
        if report_window_days <= 0.0 {
            return Err(DomainError::NonPositiveReportWindow(report_window_days));
        }

        Ok(Self {
            stock,
            incoming,
            total_units_sold,
            report_window_days,
            report_start_date,
            last_sale_date,
        })
    }
}

// ==========================================
// StatusRules - 状态判定阈值集
// ==========================================
/// 单个产品类别的判定阈值
///
/// 外部配置提供,运行期间不可变。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusRules {
    /// 热销流速下限 (件/周)
    pub hot_velocity: f64,
    /// 补货触发点 (周)
    pub reorder_point: f64,
    /// 目标覆盖周数 (周)
    pub target_wos: f64,
    /// 死库存覆盖周数阈值 (周)
    pub dead_wos: f64,
    /// 死库存在库量下限 (件)
    pub dead_on_hand: i64,
    /// "正常"流速系数 (hot_velocity 的比例,默认 0.25)
    #[serde(default = "default_good_velocity_multiplier")]
    pub good_velocity_multiplier: f64,
}

fn default_good_velocity_multiplier() -> f64 {
    0.25
}

impl StatusRules {
    /// 构造并校验阈值集
    pub fn new(
        hot_velocity: f64,
        reorder_point: f64,
        target_wos: f64,
        dead_wos: f64,
        dead_on_hand: i64,
        good_velocity_multiplier: f64,
    ) -> DomainResult<Self> {
        for (field, value) in [
            ("hot_velocity", hot_velocity),
            ("reorder_point", reorder_point),
            ("target_wos", target_wos),
            ("dead_wos", dead_wos),
        ] {
            if value <= 0.0 {
                return Err(DomainError::NonPositiveThreshold { field, value });
            }
        }
        if dead_on_hand < 0 {
            return Err(DomainError::NonPositiveThreshold {
                field: "dead_on_hand",
                value: dead_on_hand as f64,
            });
        }
        if good_velocity_multiplier <= 0.0 || good_velocity_multiplier > 1.0 {
            return Err(DomainError::MultiplierOutOfRange(good_velocity_multiplier));
        }

        Ok(Self {
            hot_velocity,
            reorder_point,
            target_wos,
            dead_wos,
            dead_on_hand,
            good_velocity_multiplier,
        })
    }

    /// 大麻类默认阈值
    pub fn default_cannabis() -> Self {
        Self {
            hot_velocity: 2.0,
            reorder_point: 2.5,
            target_wos: 4.0,
            dead_wos: 26.0,
            dead_on_hand: 5,
            good_velocity_multiplier: 0.25,
        }
    }

    /// 配件类默认阈值 (持有周期更长,热销门槛更低)
    pub fn default_accessory() -> Self {
        Self {
            hot_velocity: 0.5,
            reorder_point: 4.0,
            target_wos: 8.0,
            dead_wos: 52.0,
            dead_on_hand: 3,
            good_velocity_multiplier: 0.25,
        }
    }
}

// ==========================================
// StatusRuleBook - 按产品类别的规则表
// ==========================================
/// 两套阈值集的查找表,按 ProductClass 封闭键取值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusRuleBook {
    pub cannabis: StatusRules,
    pub accessory: StatusRules,
}

impl StatusRuleBook {
    /// 按产品类别选取阈值集
    pub fn for_class(&self, class: ProductClass) -> &StatusRules {
        match class {
            ProductClass::Cannabis => &self.cannabis,
            ProductClass::Accessory => &self.accessory,
        }
    }
}

impl Default for StatusRuleBook {
    fn default() -> Self {
        Self {
            cannabis: StatusRules::default_cannabis(),
            accessory: StatusRules::default_accessory(),
        }
    }
}
