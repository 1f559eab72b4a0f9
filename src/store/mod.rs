//! Audit log of past scans.
//!
//! Persistence is a capability: with the `audit-db` feature scans are
//! written to SQLite, without it every store operation is a no-op.

#[cfg(feature = "audit-db")]
pub mod sqlite;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::{PackageStatus, UsageResult};
use crate::config::Config;

#[cfg(feature = "audit-db")]
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "audit-db")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare audit log location: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Count of packages with one status in one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRow {
    /// Milliseconds since the Unix epoch
    pub scanned_at: i64,
    pub status: String,
    pub count: usize,
}

/// Per-scan totals built from [`TrendRow`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub scanned_at: i64,
    pub used: usize,
    pub unused: usize,
    pub dev_unused: usize,
}

impl ScanSummary {
    /// Scan time as RFC 3339, or the raw millisecond value if out of range.
    pub fn timestamp(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.scanned_at)
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_else(|| self.scanned_at.to_string())
    }
}

/// Fold trend rows (ordered by time) into one summary per scan.
pub fn summarize(rows: &[TrendRow]) -> Vec<ScanSummary> {
    let mut summaries: Vec<ScanSummary> = Vec::new();

    for row in rows {
        if summaries
            .last()
            .map_or(true, |last| last.scanned_at != row.scanned_at)
        {
            summaries.push(ScanSummary {
                scanned_at: row.scanned_at,
                ..Default::default()
            });
        }
        let Some(summary) = summaries.last_mut() else {
            continue;
        };

        if row.status == PackageStatus::Used.as_str() {
            summary.used += row.count;
        } else if row.status == PackageStatus::Unused.as_str() {
            summary.unused += row.count;
        } else if row.status == PackageStatus::DevUnused.as_str() {
            summary.dev_unused += row.count;
        }
    }

    summaries
}

/// Where scan results are recorded.
pub trait AuditStore {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Record one scan with a row per declared package.
    ///
    /// Returns the new scan id, or `None` when nothing was stored.
    fn persist_scan(&mut self, project_path: &Path, result: &UsageResult)
        -> StoreResult<Option<i64>>;

    /// Status counts per scan for `project_path`, oldest first.
    fn history(&self, project_path: &Path) -> StoreResult<Vec<TrendRow>>;
}

/// Store used when persistence is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl AuditStore for NullStore {
    fn backend(&self) -> &'static str {
        "none"
    }

    fn persist_scan(&mut self, _: &Path, _: &UsageResult) -> StoreResult<Option<i64>> {
        Ok(None)
    }

    fn history(&self, _: &Path) -> StoreResult<Vec<TrendRow>> {
        Ok(vec![])
    }
}

/// Open the audit store available in this build.
#[cfg(feature = "audit-db")]
pub fn open(config: &Config) -> StoreResult<Box<dyn AuditStore>> {
    Ok(Box::new(SqliteStore::open(&config.db_path)?))
}

/// Open the audit store available in this build.
#[cfg(not(feature = "audit-db"))]
pub fn open(config: &Config) -> StoreResult<Box<dyn AuditStore>> {
    tracing::debug!(
        db = %config.db_path.display(),
        "built without audit-db; scans will not be persisted"
    );
    Ok(Box::new(NullStore))
}
