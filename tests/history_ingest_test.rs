// ==========================================
// 快照摄取管道集成测试
// ==========================================
// 测试目标: 扫描 → 解析 → 校验 → 合并 → 归档 全流程
// 重点: 同日期重灌的幂等性;坏文件跳过不影响批次
// ==========================================


use retail_replenish::config::settings::{ColumnMapping, IngestSettings};
use retail_replenish::diagnostics::NoOpSink;
use retail_replenish::domain::sku::Sku;
use retail_replenish::domain::types::LocationCode;
use retail_replenish::importer::{ImportError, SnapshotIngestor};
use retail_replenish::logging;
use retail_replenish::repository::SalesHistoryRepository;
use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;
use test_helpers::write_csv;

/// 创建测试用的收件目录 + 历史库目录 + 摄取器
fn create_test_ingestor() -> (TempDir, TempDir, SnapshotIngestor) {
    let inbox = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();

    let settings = IngestSettings {
        inbox_dir: Some(inbox.path().to_path_buf()),
        store_dir: store.path().to_path_buf(),
        filename_prefix: "product-sales".to_string(),
    };

    let repo = SalesHistoryRepository::new(&settings.store_db_path().to_string_lossy()).unwrap();
    let ingestor = SnapshotIngestor::new(repo, settings, ColumnMapping::default());

    (inbox, store, ingestor)
}

/// 以独立连接打开历史库做断言
fn open_store(store: &TempDir) -> SalesHistoryRepository {
    let db_path = store.path().join("sales_history.db");
    SalesHistoryRepository::new(&db_path.to_string_lossy()).unwrap()
}

const SNAPSHOT_NAME: &str = "product-sales-2025-11-01-2025-11-30.csv";

fn snapshot_lines() -> Vec<&'static str> {
    vec![
        "SKU,Quantity,Location,Net sales",
        "CNB-1001,12,Hill Street,240",
        "CNB-1001,7,Valley,140",
        "GRINDER-01,3,Jasper,45",
    ]
}

#[test]
fn test_ingest_basic_batch() {
    logging::init_test();
    let (inbox, store, ingestor) = create_test_ingestor();
    write_csv(inbox.path(), SNAPSHOT_NAME, &snapshot_lines());

    let summary = ingestor.run_batch(&NoOpSink).unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.merged_files, 1);
    assert_eq!(summary.skipped_files, 0);
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.rows_overwritten, 0);

    // 行内容落库且日期取文件名中较晚的日期
    let repo = open_store(&store);
    let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
    let rows = repo.find_by_report_date(date).unwrap();
    assert_eq!(rows.len(), 3);

    let hill = rows
        .iter()
        .find(|r| r.sku.as_str() == "CNB-1001" && r.location == LocationCode::Hill)
        .unwrap();
    assert_eq!(hill.quantity_sold, 12.0);
    assert_eq!(hill.net_sales, Some(240.0));
}

#[test]
fn test_ingest_archives_merged_file() {
    logging::init_test();
    let (inbox, store, ingestor) = create_test_ingestor();
    let src = write_csv(inbox.path(), SNAPSHOT_NAME, &snapshot_lines());

    ingestor.run_batch(&NoOpSink).unwrap();

    // 原文件移出收件目录,归档目录可见
    assert!(!src.exists());
    assert!(store.path().join("Archive").join(SNAPSHOT_NAME).exists());

    // 第二次扫描不再发现候选文件
    let summary = ingestor.run_batch(&NoOpSink).unwrap();
    assert_eq!(summary.scanned, 0);
    assert_eq!(summary.merged_files, 0);
}

#[test]
fn test_reingest_same_snapshot_is_idempotent() {
    logging::init_test();
    let (inbox, store, ingestor) = create_test_ingestor();
    write_csv(inbox.path(), SNAPSHOT_NAME, &snapshot_lines());
    ingestor.run_batch(&NoOpSink).unwrap();

    let repo = open_store(&store);
    let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
    let first_rows = repo.find_by_report_date(date).unwrap();
    let first_count = repo.count_rows().unwrap();

    // 把归档的同名文件复制回收件目录,重灌一次
    let archived = store.path().join("Archive").join(SNAPSHOT_NAME);
    fs::copy(&archived, inbox.path().join(SNAPSHOT_NAME)).unwrap();

    let summary = ingestor.run_batch(&NoOpSink).unwrap();
    assert_eq!(summary.merged_files, 1);
    assert_eq!(summary.rows_overwritten, 3);

    // 行数与内容与首灌完全一致
    assert_eq!(repo.count_rows().unwrap(), first_count);
    assert_eq!(repo.find_by_report_date(date).unwrap(), first_rows);
}

#[test]
fn test_ingest_aggregates_duplicate_keys_within_file() {
    logging::init_test();
    let (inbox, store, ingestor) = create_test_ingestor();
    // 同一 (SKU, 门店) 两行: 合并求和,保证键唯一性不变式
    write_csv(
        inbox.path(),
        SNAPSHOT_NAME,
        &[
            "SKU,Quantity,Location",
            "CNB-1001,5,Hill",
            "CNB-1001,4,Hill Street Store",
        ],
    );

    let summary = ingestor.run_batch(&NoOpSink).unwrap();
    assert_eq!(summary.rows_written, 1);

    let repo = open_store(&store);
    let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
    let rows = repo.find_by_report_date(date).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity_sold, 9.0);
}

#[test]
fn test_ingest_skips_file_without_date_range() {
    logging::init_test();
    let (inbox, _store, ingestor) = create_test_ingestor();
    // 前缀匹配但文件名只带一个日期 → 不符合约定,不进候选
    write_csv(
        inbox.path(),
        "product-sales-2025-11-30.csv",
        &snapshot_lines(),
    );

    let summary = ingestor.run_batch(&NoOpSink).unwrap();
    assert_eq!(summary.scanned, 0);
    assert_eq!(summary.merged_files, 0);
}

#[test]
fn test_ingest_ignores_unrelated_files() {
    logging::init_test();
    let (inbox, _store, ingestor) = create_test_ingestor();
    // 前缀不匹配的下载文件不触碰
    write_csv(
        inbox.path(),
        "bank-statement-2025-11-01-2025-11-30.csv",
        &["Account,Amount", "A1,100"],
    );

    let summary = ingestor.run_batch(&NoOpSink).unwrap();
    assert_eq!(summary.scanned, 0);
}

#[test]
fn test_ingest_rejects_empty_snapshot_but_continues_batch() {
    logging::init_test();
    let (inbox, store, ingestor) = create_test_ingestor();
    // 文件 1: 映射后零可用行 (SKU 全部非法) → 拒绝合并
    write_csv(
        inbox.path(),
        "product-sales-2025-10-01-2025-10-31.csv",
        &["SKU,Quantity,Location", "---,5,Hill"],
    );
    // 文件 2: 正常
    write_csv(inbox.path(), SNAPSHOT_NAME, &snapshot_lines());

    let summary = ingestor.run_batch(&NoOpSink).unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.merged_files, 1);
    assert_eq!(summary.skipped_files, 1);
    assert_eq!(summary.invalid_sku_rows, 1);

    // 单文件失败不回滚另一文件已完成的合并
    let repo = open_store(&store);
    assert_eq!(repo.count_rows().unwrap(), 3);
}

#[test]
fn test_ingest_missing_inbox_is_not_fatal() {
    logging::init_test();
    let store = TempDir::new().unwrap();
    let settings = IngestSettings {
        inbox_dir: Some(store.path().join("does-not-exist")),
        store_dir: store.path().to_path_buf(),
        filename_prefix: "product-sales".to_string(),
    };
    let repo = SalesHistoryRepository::new(&settings.store_db_path().to_string_lossy()).unwrap();
    let ingestor = SnapshotIngestor::new(repo, settings, ColumnMapping::default());

    let summary = ingestor.run_batch(&NoOpSink).unwrap();
    assert_eq!(summary.scanned, 0);
}

#[test]
fn test_rolling_query_sees_ingested_rows() {
    logging::init_test();
    let (inbox, store, ingestor) = create_test_ingestor();
    write_csv(inbox.path(), SNAPSHOT_NAME, &snapshot_lines());
    ingestor.run_batch(&NoOpSink).unwrap();

    let repo = open_store(&store);
    let sku = Sku::parse("CNB-1001").unwrap();
    let sum = repo
        .sum_quantity_in_window(
            &sku,
            LocationCode::Hill,
            NaiveDate::from_ymd_opt(2025, 11, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
        )
        .unwrap();
    assert_eq!(sum, 12.0);
}

#[test]
fn test_import_error_display_is_descriptive() {
    let err = ImportError::EmptySnapshot("x.csv".to_string());
    assert!(err.to_string().contains("x.csv"));
}
