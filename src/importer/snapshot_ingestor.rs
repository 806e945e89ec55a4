// ==========================================
// 零售补货分析系统 - 快照摄取管道
// ==========================================
// 职责: 收件目录扫描 → 解析 → 校验 → 合并入历史库 → 归档
// 流程: Idle → Scanning → (逐文件: Parsing → Validating → Merging)
//       → Persisting → Idle
// 红线: 历史库是单写者资源;同库并发摄取不受支持,入口处持运行守卫
// 约定: 单个文件失败只跳过该文件,已完成的合并不回滚
// ==========================================

use crate::config::settings::{ColumnMapping, IngestSettings};
use crate::diagnostics::{DiagnosticLine, DiagnosticsSink};
use crate::domain::records::SnapshotRow;
use crate::domain::sku::Sku;
use crate::domain::types::LocationCode;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::SnapshotFieldMapper;
use crate::importer::file_parser::UniversalFileParser;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// IngestSummary - 摄取批次汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// 批次标识
    pub batch_id: String,
    /// 符合文件名约定的候选文件数
    pub scanned: usize,
    /// 成功合并的文件数
    pub merged_files: usize,
    /// 跳过的文件数 (锁定/解析失败/空快照)
    pub skipped_files: usize,
    /// 写入历史库的行数
    pub rows_written: usize,
    /// 被同日期重灌覆盖的旧行数
    pub rows_overwritten: usize,
    /// SKU 无法标准化被排除的行数
    pub invalid_sku_rows: usize,
    /// 门店无法归属的行数
    pub unmapped_location_rows: usize,
}

// ==========================================
// SnapshotIngestor - 快照摄取器
// ==========================================
pub struct SnapshotIngestor {
    repo: crate::repository::SalesHistoryRepository,
    settings: IngestSettings,
    mapper: SnapshotFieldMapper,
    // 单写者守卫: 同一摄取器上的并发批次直接拒绝
    run_guard: Mutex<()>,
}

impl SnapshotIngestor {
    /// 创建摄取器
    ///
    /// # 参数
    /// - repo: 销售历史库仓储
    /// - settings: 摄取设置 (收件目录/库目录/文件名前缀)
    /// - mapping: 源列名映射
    pub fn new(
        repo: crate::repository::SalesHistoryRepository,
        settings: IngestSettings,
        mapping: ColumnMapping,
    ) -> Self {
        Self {
            repo,
            settings,
            mapper: SnapshotFieldMapper::new(mapping),
            run_guard: Mutex::new(()),
        }
    }

    /// 执行一个摄取批次
    ///
    /// 逐文件顺序处理;单文件失败跳过并告警,批次继续。
    /// 已合并文件移入归档目录,后续扫描不再重复处理。
    ///
    /// # 返回
    /// - Err(ImportError::IngestInProgress): 已有批次在运行
    pub fn run_batch(&self, sink: &dyn DiagnosticsSink) -> ImportResult<IngestSummary> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| ImportError::IngestInProgress)?;

        let batch_id = Uuid::new_v4().to_string();
        let inbox = self.settings.effective_inbox();
        info!(batch_id = %batch_id, inbox = %inbox.display(), "开始快照摄取批次");

        let mut summary = IngestSummary {
            batch_id,
            ..IngestSummary::default()
        };

        // === Scanning: 收件目录扫描 ===
        if !inbox.is_dir() {
            let msg = format!("收件目录不存在: {}", inbox.display());
            warn!("{}", msg);
            sink.emit(DiagnosticLine::warning(msg));
            return Ok(summary);
        }

        let candidates = self.scan_inbox(&inbox, sink)?;
        summary.scanned = candidates.len();
        if candidates.is_empty() {
            sink.emit(DiagnosticLine::info("收件目录中没有新的销售快照"));
            return Ok(summary);
        }

        // === 逐文件: Parsing → Validating → Merging ===
        for (path, report_end_date) in candidates {
            match self.ingest_file(&path, report_end_date, &mut summary, sink) {
                Ok(()) => {
                    summary.merged_files += 1;
                    // Archiving: 移出收件目录,防止重复处理
                    self.archive_file(&path, sink);
                }
                Err(e) => {
                    summary.skipped_files += 1;
                    let msg = format!("跳过快照 {}: {}", path.display(), e);
                    warn!("{}", msg);
                    sink.emit(DiagnosticLine::warning(msg));
                }
            }
        }

        // === Persisting: 每个文件的合并已独立提交,此处只汇报 ===
        info!(
            merged = summary.merged_files,
            skipped = summary.skipped_files,
            rows = summary.rows_written,
            overwritten = summary.rows_overwritten,
            "快照摄取批次完成"
        );
        sink.emit(DiagnosticLine::info(format!(
            "摄取完成: 合并 {} 个文件, 跳过 {} 个, 写入 {} 行",
            summary.merged_files, summary.skipped_files, summary.rows_written
        )));

        Ok(summary)
    }

    // ==========================================
    // Scanning
    // ==========================================

    /// 扫描收件目录,返回 (文件路径, 报表截止日) 候选清单
    ///
    /// 过滤: 文件名前缀 + 支持的扩展名 + 文件名内嵌日期段。
    /// 符合前缀但日期段缺失的文件告警跳过 (不致命)。
    fn scan_inbox(
        &self,
        inbox: &Path,
        sink: &dyn DiagnosticsSink,
    ) -> ImportResult<Vec<(PathBuf, NaiveDate)>> {
        let mut candidates = Vec::new();

        for entry in std::fs::read_dir(inbox)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            // 前缀过滤,避免误触收件目录里的其他文件
            if !self.settings.filename_prefix.is_empty()
                && !file_name.starts_with(&self.settings.filename_prefix)
            {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !matches!(ext.as_str(), "csv" | "xlsx" | "xls") {
                continue;
            }

            match SnapshotFieldMapper::extract_report_end_date(&file_name) {
                Ok(date) => candidates.push((path, date)),
                Err(e) => {
                    let msg = format!("文件名不符合快照约定,跳过: {}", e);
                    warn!("{}", msg);
                    sink.emit(DiagnosticLine::warning(msg));
                }
            }
        }

        // 排序保证批次处理顺序确定
        candidates.sort();
        Ok(candidates)
    }

    // ==========================================
    // Parsing / Validating / Merging (单文件)
    // ==========================================

    /// 摄取单个快照文件
    fn ingest_file(
        &self,
        path: &Path,
        report_end_date: NaiveDate,
        summary: &mut IngestSummary,
        sink: &dyn DiagnosticsSink,
    ) -> ImportResult<()> {
        // 尽力而为的占用检查: 导出器尚未写完的文件跳过
        self.check_not_locked(path)?;

        debug!(file = %path.display(), date = %report_end_date, "解析快照文件");
        let raw_rows = UniversalFileParser.parse(path)?;

        // 行映射 + 按 (SKU, 门店) 聚合,保证历史库键唯一性不变式
        let mut aggregated: BTreeMap<(Sku, LocationCode), (f64, Option<f64>)> = BTreeMap::new();
        for raw in &raw_rows {
            let row = match self.mapper.map_snapshot_row(raw, report_end_date) {
                Some(row) => row,
                None => {
                    summary.invalid_sku_rows += 1;
                    continue;
                }
            };
            if row.location == LocationCode::Unmapped {
                summary.unmapped_location_rows += 1;
            }

            let slot = aggregated
                .entry((row.sku, row.location))
                .or_insert((0.0, None));
            slot.0 += row.quantity_sold;
            if let Some(net) = row.net_sales {
                slot.1 = Some(slot.1.unwrap_or(0.0) + net);
            }
        }

        // Validating: 映射后零可用行的文件拒绝合并
        if aggregated.is_empty() {
            return Err(ImportError::EmptySnapshot(path.display().to_string()));
        }

        let rows: Vec<SnapshotRow> = aggregated
            .into_iter()
            .map(|((sku, location), (quantity_sold, net_sales))| SnapshotRow {
                sku,
                location,
                report_end_date,
                quantity_sold,
                net_sales,
            })
            .collect();

        // Merging: 同截止日旧行删除 + 新行写入,单事务,幂等
        let (removed, inserted) = self.repo.replace_report_date(report_end_date, &rows)?;
        summary.rows_overwritten += removed;
        summary.rows_written += inserted;

        if removed > 0 {
            sink.emit(DiagnosticLine::info(format!(
                "覆盖 {} 行旧快照 ({})",
                removed, report_end_date
            )));
        }
        sink.emit(DiagnosticLine::info(format!(
            "合并快照 {} ({} 行)",
            path.display(),
            inserted
        )));

        Ok(())
    }

    /// 尽力而为的文件占用检查
    ///
    /// 以写模式试开一次;被外部导出器独占的文件返回 FileLocked
    fn check_not_locked(&self, path: &Path) -> ImportResult<()> {
        OpenOptions::new()
            .write(true)
            .open(path)
            .map(|_| ())
            .map_err(|_| ImportError::FileLocked(path.display().to_string()))
    }

    // ==========================================
    // Archiving
    // ==========================================

    /// 将已合并文件移入归档目录 (失败仅告警)
    fn archive_file(&self, path: &Path, sink: &dyn DiagnosticsSink) {
        let archive_dir = self.settings.archive_dir();
        if let Err(e) = std::fs::create_dir_all(&archive_dir) {
            warn!(error = %e, "归档目录创建失败");
            return;
        }

        let file_name = match path.file_name() {
            Some(name) => name,
            None => return,
        };

        match std::fs::rename(path, archive_dir.join(file_name)) {
            Ok(()) => {
                sink.emit(DiagnosticLine::info(format!(
                    "已归档: {}",
                    file_name.to_string_lossy()
                )));
            }
            Err(e) => {
                let msg = format!("归档移动失败 {}: {}", path.display(), e);
                warn!("{}", msg);
                sink.emit(DiagnosticLine::warning(msg));
            }
        }
    }
}
