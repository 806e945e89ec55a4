// ==========================================
// 零售补货分析系统 - 销售历史库仓储
// ==========================================
// 红线: Repository 不含业务逻辑,只负责数据访问
// 不变式: (sku, location, report_end_date) 至多一行
// 生命周期: 首次打开时建表;只增不减,同日期重灌覆盖
// ==========================================

use crate::db::{open_sqlite_connection, CURRENT_SCHEMA_VERSION};
use crate::domain::records::SnapshotRow;
use crate::domain::sku::Sku;
use crate::domain::types::LocationCode;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// SalesHistoryRepository - 销售历史库
// ==========================================
pub struct SalesHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SalesHistoryRepository {
    /// 打开 (必要时创建) 销售历史库
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.init_schema()?;
        Ok(repo)
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 初始化 schema (幂等)
    fn init_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS sales_history (
                sku TEXT NOT NULL,
                location TEXT NOT NULL,
                report_end_date TEXT NOT NULL,
                quantity_sold REAL NOT NULL DEFAULT 0,
                net_sales REAL,
                ingested_at TEXT NOT NULL,
                PRIMARY KEY (sku, location, report_end_date)
            );

            CREATE INDEX IF NOT EXISTS idx_sales_history_date
                ON sales_history (report_end_date);
            "#,
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![CURRENT_SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// 以报表截止日为单位覆盖写入 (幂等合并)
    ///
    /// 同一事务内先删除该日期的全部旧行,再插入新行。
    /// 重灌同一快照日期得到的最终状态与首灌完全一致。
    ///
    /// # 参数
    /// - report_end_date: 快照截止日
    /// - rows: 该快照的全部行 (须同属该截止日)
    ///
    /// # 返回
    /// - Ok((removed, inserted)): 被覆盖的旧行数与写入的新行数
    pub fn replace_report_date(
        &self,
        report_end_date: NaiveDate,
        rows: &[SnapshotRow],
    ) -> RepositoryResult<(usize, usize)> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let removed = tx.execute(
            "DELETE FROM sales_history WHERE report_end_date = ?1",
            params![report_end_date.to_string()],
        )?;

        let ingested_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut inserted = 0;
        for row in rows {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO sales_history (
                    sku, location, report_end_date, quantity_sold, net_sales, ingested_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    row.sku.as_str(),
                    row.location.as_str(),
                    row.report_end_date.to_string(),
                    row.quantity_sold,
                    row.net_sales,
                    ingested_at,
                ],
            )?;
            inserted += 1;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok((removed, inserted))
    }

    /// 历史库总行数
    pub fn count_rows(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sales_history", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 窗口销量求和 (半开区间 (after, until])
    ///
    /// # 参数
    /// - sku: 标准化 SKU
    /// - location: 门店
    /// - after: 窗口起点 (不含)
    /// - until: 窗口终点 (含)
    pub fn sum_quantity_in_window(
        &self,
        sku: &Sku,
        location: LocationCode,
        after: NaiveDate,
        until: NaiveDate,
    ) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        let total: f64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(quantity_sold), 0)
            FROM sales_history
            WHERE sku = ?1 AND location = ?2
              AND report_end_date > ?3 AND report_end_date <= ?4
            "#,
            params![
                sku.as_str(),
                location.as_str(),
                after.to_string(),
                until.to_string()
            ],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// 查询某截止日的全部行 (按 SKU、门店排序)
    pub fn find_by_report_date(
        &self,
        report_end_date: NaiveDate,
    ) -> RepositoryResult<Vec<SnapshotRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, location, report_end_date, quantity_sold, net_sales
            FROM sales_history
            WHERE report_end_date = ?1
            ORDER BY sku ASC, location ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![report_end_date.to_string()], map_snapshot_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 查询某 (SKU, 门店) 的全部历史行 (按日期倒序)
    pub fn find_by_sku_location(
        &self,
        sku: &Sku,
        location: LocationCode,
    ) -> RepositoryResult<Vec<SnapshotRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, location, report_end_date, quantity_sold, net_sales
            FROM sales_history
            WHERE sku = ?1 AND location = ?2
            ORDER BY report_end_date DESC
            "#,
        )?;

        let rows = stmt
            .query_map(params![sku.as_str(), location.as_str()], map_snapshot_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 已入库的快照截止日清单 (倒序)
    pub fn list_report_dates(&self) -> RepositoryResult<Vec<NaiveDate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT report_end_date FROM sales_history ORDER BY report_end_date DESC",
        )?;
        let dates = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?
            .into_iter()
            .filter_map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
            .collect();
        Ok(dates)
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 行映射: sales_history → SnapshotRow
fn map_snapshot_row(row: &rusqlite::Row<'_>) -> SqliteResult<SnapshotRow> {
    let sku_str: String = row.get(0)?;
    let location_str: String = row.get(1)?;
    let date_str: String = row.get(2)?;

    Ok(SnapshotRow {
        // 库中存的已是标准化键,解析失败时保持原值进入诊断
        sku: Sku::parse(&sku_str).unwrap_or_else(|| Sku::parse("UNKNOWN").unwrap()),
        location: LocationCode::from_raw(&location_str),
        report_end_date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        quantity_sold: row.get(3)?,
        net_sales: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn open_temp_repo() -> (NamedTempFile, SalesHistoryRepository) {
        let temp = NamedTempFile::new().unwrap();
        let repo = SalesHistoryRepository::new(temp.path().to_str().unwrap()).unwrap();
        (temp, repo)
    }

    fn snapshot_row(sku: &str, loc: LocationCode, date: NaiveDate, qty: f64) -> SnapshotRow {
        SnapshotRow {
            sku: Sku::parse(sku).unwrap(),
            location: loc,
            report_end_date: date,
            quantity_sold: qty,
            net_sales: None,
        }
    }

    #[test]
    fn test_replace_report_date_is_idempotent() {
        let (_temp, repo) = open_temp_repo();
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let rows = vec![
            snapshot_row("CNB-1001", LocationCode::Hill, date, 12.0),
            snapshot_row("CNB-1001", LocationCode::Valley, date, 7.0),
        ];

        let (removed, inserted) = repo.replace_report_date(date, &rows).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(inserted, 2);
        assert_eq!(repo.count_rows().unwrap(), 2);

        // 重灌同一日期: 覆盖而非追加
        let (removed, inserted) = repo.replace_report_date(date, &rows).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(inserted, 2);
        assert_eq!(repo.count_rows().unwrap(), 2);
    }

    #[test]
    fn test_sum_quantity_in_window_half_open() {
        let (_temp, repo) = open_temp_repo();
        let d1 = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        repo.replace_report_date(d1, &[snapshot_row("CNB-1001", LocationCode::Hill, d1, 8.0)])
            .unwrap();
        repo.replace_report_date(d2, &[snapshot_row("CNB-1001", LocationCode::Hill, d2, 5.0)])
            .unwrap();

        let sku = Sku::parse("CNB-1001").unwrap();
        // (10-31, 11-30]: 仅 d2 落入 (起点不含)
        let sum = repo
            .sum_quantity_in_window(&sku, LocationCode::Hill, d1, d2)
            .unwrap();
        assert_eq!(sum, 5.0);

        // (09-30, 11-30]: 两行都落入
        let after = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        let sum = repo
            .sum_quantity_in_window(&sku, LocationCode::Hill, after, d2)
            .unwrap();
        assert_eq!(sum, 13.0);
    }

    #[test]
    fn test_find_by_sku_location_ordering() {
        let (_temp, repo) = open_temp_repo();
        let d1 = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        repo.replace_report_date(d1, &[snapshot_row("CNB-1001", LocationCode::Hill, d1, 8.0)])
            .unwrap();
        repo.replace_report_date(d2, &[snapshot_row("CNB-1001", LocationCode::Hill, d2, 5.0)])
            .unwrap();

        let sku = Sku::parse("CNB-1001").unwrap();
        let rows = repo.find_by_sku_location(&sku, LocationCode::Hill).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].report_end_date, d2); // 倒序
        assert_eq!(repo.list_report_dates().unwrap(), vec![d2, d1]);
    }
}
