// ==========================================
// 零售补货分析系统 - 分析运行编排器
// ==========================================
// 职责: 一次分析运行的完整管道
// 流程: 读取导出文件 → 对账 → 逐 (SKU, 门店) 独立计算
//       流速/状态/SOQ → 汇总报告
// 红线: 库存与销售导出缺失即整次运行失败,不产出部分结果;
//       每个 SKU 的输入先完成对账,SKU 间无共享可变状态
// 说明: 运行在阻塞工作线程上执行,完成经单次回调上报,
//       诊断行经有界通道增量送出;不支持中途取消
// ==========================================

use crate::config::settings::{AnalysisSettings, InputPaths};
use crate::diagnostics::{DiagnosticLine, DiagnosticsSink};
use crate::domain::metrics::InventoryMetrics;
use crate::domain::records::{AnalysisReport, ReconciledRecord, SkuAssessment};
use crate::domain::types::LocationCode;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::reconciler::{LocationReconciler, ReconcileInput};
use crate::engine::replenishment::ReplenishmentPlanner;
use crate::engine::rolling::RollingVelocityEngine;
use crate::engine::status::StatusClassifier;
use crate::engine::velocity::{VelocityModel, DEFAULT_SILENCE_THRESHOLD};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use crate::repository::SalesHistoryRepository;
use chrono::{Duration, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// AnalysisOrchestrator - 分析运行编排器
// ==========================================
pub struct AnalysisOrchestrator {
    settings: AnalysisSettings,
    velocity_model: VelocityModel,
    classifier: StatusClassifier,
    planner: ReplenishmentPlanner,
    rolling_engine: RollingVelocityEngine,
    reconciler: LocationReconciler,
}

impl AnalysisOrchestrator {
    /// 构造函数
    ///
    /// 阈值/映射在此一次性固化,运行期间不再读任何共享配置
    pub fn new(settings: AnalysisSettings) -> Self {
        let reconciler = LocationReconciler::new(
            settings.column_mapping.clone(),
            settings.po_destination,
        );
        let planner = ReplenishmentPlanner::new(settings.accessory_manual_ordering);

        Self {
            settings,
            velocity_model: VelocityModel::new(),
            classifier: StatusClassifier::new(),
            planner,
            rolling_engine: RollingVelocityEngine::new(),
            reconciler,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行一次分析运行 (同步)
    ///
    /// # 参数
    /// - `inputs`: 输入文件清单 (库存/销售为必填)
    /// - `history`: 销售历史库 (可选;提供时做流速融合与趋势)
    /// - `today`: 分析基准日 (窗口终点)
    /// - `sink`: 诊断行出口
    ///
    /// # 返回
    /// - Ok(AnalysisReport): 完整、内部一致的结果集
    /// - Err: 明确失败,无部分输出
    #[instrument(skip_all, fields(window_days = self.settings.report_window_days))]
    pub fn run(
        &self,
        inputs: &InputPaths,
        history: Option<&SalesHistoryRepository>,
        today: NaiveDate,
        sink: &dyn DiagnosticsSink,
    ) -> EngineResult<AnalysisReport> {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, "开始补货分析运行");
        sink.emit(DiagnosticLine::info("开始补货分析运行"));

        // === 1. 读取必填导出文件 ===
        let inventory_path = inputs
            .inventory
            .as_deref()
            .ok_or(EngineError::MissingRequiredInput("库存导出文件"))?;
        let sales_path = inputs
            .sales
            .as_deref()
            .ok_or(EngineError::MissingRequiredInput("销售导出文件"))?;

        sink.emit(DiagnosticLine::info("读取数据文件..."));
        let inventory_rows = UniversalFileParser.parse(inventory_path)?;
        let sales_rows = UniversalFileParser.parse(sales_path)?;

        // === 2. 读取可选导出文件 (缺失/损坏降级,告警不中断) ===
        let mut diag_acc = crate::domain::records::ReconcileDiagnostics::default();

        let po_rows = self.load_optional(inputs.purchase_orders.as_deref(), "采购单", sink);
        let purchase_orders = self.reconciler.load_purchase_orders(&po_rows, &mut diag_acc);

        let mut transfers = Vec::new();
        for path in &inputs.transfers {
            let rows = self.load_optional(Some(path.as_path()), "调拨", sink);
            // 文件级默认: 目的店从文件名推断,来源为采购路由店 (中心店)
            let default_dest = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(LocationCode::from_raw)
                .unwrap_or(LocationCode::Unmapped);
            transfers.extend(self.reconciler.load_transfer_records(
                &rows,
                self.settings.po_destination,
                default_dest,
                &mut diag_acc,
            ));
        }

        let case_rows = self.load_optional(inputs.case_reference.as_deref(), "箱规参考", sink);
        let case_sizes = self.reconciler.load_case_sizes(&case_rows, &mut diag_acc);

        // === 3. 对账 ===
        sink.emit(DiagnosticLine::info("多门店对账..."));
        let reconcile_input = ReconcileInput {
            inventory_rows,
            sales_rows,
            transfers,
            purchase_orders,
            case_sizes,
        };
        let (records, mut diagnostics) = self.reconciler.reconcile(&reconcile_input, sink);
        diagnostics.merge(&diag_acc);

        // === 4. 逐 (SKU, 门店) 独立评估 ===
        sink.emit(DiagnosticLine::info(format!(
            "计算 {} 条 (SKU, 门店) 指标...",
            records.len()
        )));
        let report_start_date = today - Duration::days(self.settings.report_window_days as i64);
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            rows.push(self.assess_record(record, history, report_start_date, today, sink)?);
        }

        info!(run_id = %run_id, rows = rows.len(), "补货分析运行完成");
        sink.emit(DiagnosticLine::info(format!(
            "分析完成: {} 行评估结果",
            rows.len()
        )));

        Ok(AnalysisReport {
            run_id,
            generated_at: Utc::now(),
            report_window_days: self.settings.report_window_days,
            rows,
            diagnostics,
        })
    }

    /// 单条对账记录的评估 (纯逐条映射,记录间互不依赖)
    fn assess_record(
        &self,
        record: &ReconciledRecord,
        history: Option<&SalesHistoryRepository>,
        report_start_date: NaiveDate,
        today: NaiveDate,
        sink: &dyn DiagnosticsSink,
    ) -> EngineResult<SkuAssessment> {
        // 退货冲销可能把窗口销量冲成负数,按数据质量问题归零
        let mut units_sold = record.units_sold;
        if units_sold < 0.0 {
            sink.emit(DiagnosticLine::warning(format!(
                "窗口销量为负,按 0 处理: {} @ {}",
                record.sku, record.location
            )));
            units_sold = 0.0;
        }

        let metrics = InventoryMetrics::new(
            record.stock,
            record.incoming,
            units_sold,
            self.settings.report_window_days,
            report_start_date,
            record.last_sale_date,
        )?;

        // 当次运行流速 (断货修正后)
        let run_velocity = self.velocity_model.compute_velocity(&metrics);

        // 历史融合: 滚动流速为正时覆盖
        let (velocity, trend) = match history {
            Some(store) => {
                let rolling = self.rolling_engine.compute(
                    store,
                    &record.sku,
                    record.location,
                    today,
                    self.settings.rolling_window_weeks,
                )?;
                (
                    self.velocity_model.blend_with_history(run_velocity, rolling.velocity),
                    Some(rolling.trend),
                )
            }
            None => (run_velocity, None),
        };

        let product_class = record.sku.product_class();
        let rules = self.settings.rules.for_class(product_class);

        let weeks_of_stock = self.velocity_model.compute_effective_wos(
            record.stock,
            0,
            velocity,
            DEFAULT_SILENCE_THRESHOLD,
        )?;

        let status = self.classifier.classify(
            velocity,
            record.stock,
            record.incoming,
            product_class,
            rules,
        )?;

        let suggested_order_qty = self.planner.plan_order(
            velocity,
            record.stock,
            record.incoming,
            product_class,
            rules,
            record.case_size,
        );

        Ok(SkuAssessment {
            sku: record.sku.clone(),
            product_class,
            location: record.location,
            status,
            suggested_order_qty,
            velocity,
            weeks_of_stock,
            stock: record.stock,
            incoming: record.incoming,
            units_sold,
            case_size: record.case_size,
            trend,
        })
    }

    /// 读取可选导出文件;缺失或损坏时降级为空并告警
    fn load_optional(
        &self,
        path: Option<&Path>,
        label: &str,
        sink: &dyn DiagnosticsSink,
    ) -> Vec<RawRecord> {
        let path = match path {
            Some(p) => p,
            None => return Vec::new(),
        };
        match UniversalFileParser.parse(path) {
            Ok(rows) => rows,
            Err(e) => {
                let msg = format!("{}文件读取失败,按缺失处理: {}", label, e);
                warn!("{}", msg);
                sink.emit(DiagnosticLine::warning(msg));
                Vec::new()
            }
        }
    }
}

// ==========================================
// 后台运行 (脱离交互线程)
// ==========================================

/// 在阻塞工作线程上执行分析,完成后以单次回调上报结果
///
/// 调用方保持响应;诊断行经 `sink` (通常为有界通道) 增量送出。
/// 失败时不写任何报告,回调收到 Err。
///
/// # 参数
/// - `history_db`: 历史库文件路径 (可选;打开失败按无历史降级)
pub fn run_detached(
    settings: AnalysisSettings,
    inputs: InputPaths,
    history_db: Option<PathBuf>,
    today: NaiveDate,
    sink: Arc<dyn DiagnosticsSink>,
    on_complete: impl FnOnce(EngineResult<AnalysisReport>) + Send + 'static,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let history = history_db.and_then(|path| {
            match SalesHistoryRepository::new(&path.to_string_lossy()) {
                Ok(repo) => Some(repo),
                Err(e) => {
                    let msg = format!("历史库打开失败,按无历史运行: {}", e);
                    warn!("{}", msg);
                    sink.emit(DiagnosticLine::warning(msg));
                    None
                }
            }
        });

        let orchestrator = AnalysisOrchestrator::new(settings);
        let result = orchestrator.run(&inputs, history.as_ref(), today, sink.as_ref());
        on_complete(result);
    })
}
