// ==========================================
// 零售补货分析系统 - 命令行主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 多门店补货决策支持
// 用法:
//   retail-replenish ingest  [settings.json]   # 摄取销售快照入历史库
//   retail-replenish analyze [settings.json]   # 执行补货分析
// ==========================================

use retail_replenish::config::AppSettings;
use retail_replenish::diagnostics::TracingSink;
use retail_replenish::engine::AnalysisOrchestrator;
use retail_replenish::importer::SnapshotIngestor;
use retail_replenish::repository::SalesHistoryRepository;
use retail_replenish::{logging, APP_NAME, VERSION};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);
    let settings_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("settings.json"));

    match command {
        Some("ingest") => run_ingest(&settings_path),
        Some("analyze") => run_analyze(&settings_path),
        _ => {
            eprintln!("用法:");
            eprintln!("  retail-replenish ingest  [settings.json]   摄取销售快照入历史库");
            eprintln!("  retail-replenish analyze [settings.json]   执行补货分析");
            ExitCode::FAILURE
        }
    }
}

/// 摄取销售快照入历史库
fn run_ingest(settings_path: &Path) -> ExitCode {
    let settings = AppSettings::load(settings_path);

    if let Err(e) = std::fs::create_dir_all(&settings.ingest.store_dir) {
        tracing::error!(error = %e, "历史库目录创建失败");
        return ExitCode::FAILURE;
    }

    let db_path = settings.ingest.store_db_path();
    let repo = match SalesHistoryRepository::new(&db_path.to_string_lossy()) {
        Ok(repo) => repo,
        Err(e) => {
            tracing::error!(error = %e, "历史库打开失败");
            return ExitCode::FAILURE;
        }
    };

    let ingestor = SnapshotIngestor::new(
        repo,
        settings.ingest.clone(),
        settings.analysis.column_mapping.clone(),
    );

    match ingestor.run_batch(&TracingSink) {
        Ok(summary) => {
            tracing::info!(
                merged = summary.merged_files,
                skipped = summary.skipped_files,
                rows = summary.rows_written,
                "摄取批次结束"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "摄取批次失败");
            ExitCode::FAILURE
        }
    }
}

/// 执行补货分析
fn run_analyze(settings_path: &Path) -> ExitCode {
    let settings = AppSettings::load(settings_path);

    // 历史库存在时参与流速融合,否则按单次运行估计
    let db_path = settings.ingest.store_db_path();
    let history = if db_path.exists() {
        match SalesHistoryRepository::new(&db_path.to_string_lossy()) {
            Ok(repo) => Some(repo),
            Err(e) => {
                tracing::warn!(error = %e, "历史库打开失败,按无历史运行");
                None
            }
        }
    } else {
        tracing::info!("历史库尚未建立,按单次运行估计流速");
        None
    };

    let today = chrono::Local::now().date_naive();
    let orchestrator = AnalysisOrchestrator::new(settings.analysis.clone());

    match orchestrator.run(&settings.inputs, history.as_ref(), today, &TracingSink) {
        Ok(report) => {
            tracing::info!(
                run_id = %report.run_id,
                rows = report.rows.len(),
                "分析完成"
            );
            // 评估结果以 JSON 输出到标准输出,由外部报表渲染方消费
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    tracing::error!(error = %e, "报告序列化失败");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "分析运行失败");
            ExitCode::FAILURE
        }
    }
}
