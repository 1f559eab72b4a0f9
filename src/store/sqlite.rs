//! SQLite-backed audit log.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use super::{AuditStore, StoreResult, TrendRow};
use crate::analysis::UsageResult;

const SCHEMA: &str = "
    create table if not exists scans (
        id integer primary key autoincrement,
        project_path text not null,
        scanned_at integer not null
    );
    create table if not exists scan_items (
        id integer primary key autoincrement,
        scan_id integer not null,
        name text not null,
        status text not null,
        foreign key(scan_id) references scans(id)
    );
";

const TREND_QUERY: &str = "
    select s.scanned_at, si.status, count(*)
    from scan_items si
    join scans s on s.id = si.scan_id
    where s.project_path = ?1
    group by s.scanned_at, si.status
    order by s.scanned_at asc, si.status asc
";

pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        tracing::debug!(db = %path.display(), "opened audit log");

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn init(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch("pragma foreign_keys = on;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a scan taken at `scanned_at` (ms since epoch) in one transaction.
    pub fn record(
        &mut self,
        project_path: &Path,
        result: &UsageResult,
        scanned_at: i64,
    ) -> StoreResult<i64> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "insert into scans(project_path, scanned_at) values (?1, ?2)",
            params![project_path.to_string_lossy(), scanned_at],
        )?;
        let scan_id = tx.last_insert_rowid();

        {
            let mut stmt =
                tx.prepare("insert into scan_items(scan_id, name, status) values (?1, ?2, ?3)")?;
            for (name, status) in result.statuses() {
                stmt.execute(params![scan_id, name, status.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(scan_id)
    }
}

impl AuditStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn persist_scan(
        &mut self,
        project_path: &Path,
        result: &UsageResult,
    ) -> StoreResult<Option<i64>> {
        let now = chrono::Utc::now().timestamp_millis();
        let scan_id = self.record(project_path, result, now)?;
        tracing::debug!(project = %project_path.display(), scan_id, "persisted scan");
        Ok(Some(scan_id))
    }

    fn history(&self, project_path: &Path) -> StoreResult<Vec<TrendRow>> {
        let mut stmt = self.conn.prepare(TREND_QUERY)?;
        let rows = stmt
            .query_map(params![project_path.to_string_lossy()], |row| {
                Ok(TrendRow {
                    scanned_at: row.get(0)?,
                    status: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
