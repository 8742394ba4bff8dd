//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ReportStore trait.

use crate::report::{ExtractedRecord, RunReport};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ReportStore, StorageError, StorageResult};
use crate::storage::StoredReport;
use crate::SweepError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const REPORT_COLUMNS: &str =
    "id, created_at, page_count, record_count, error_summary, records_json, config_hash";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// A `run_reports` row before decoding
struct ReportRow {
    id: i64,
    created_at: String,
    page_count: i64,
    record_count: i64,
    error_summary: String,
    records_json: Option<String>,
    config_hash: String,
}

impl ReportRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            page_count: row.get(2)?,
            record_count: row.get(3)?,
            error_summary: row.get(4)?,
            records_json: row.get(5)?,
            config_hash: row.get(6)?,
        })
    }

    fn decode(self) -> StorageResult<StoredReport> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| {
                StorageError::Serialization(format!(
                    "Invalid timestamp '{}' on report {}: {}",
                    self.created_at, self.id, e
                ))
            })?
            .with_timezone(&Utc);

        let page_count = u32::try_from(self.page_count).map_err(|_| {
            StorageError::Database(format!(
                "Report {} has invalid page_count {}",
                self.id, self.page_count
            ))
        })?;
        let record_count = usize::try_from(self.record_count).map_err(|_| {
            StorageError::Database(format!(
                "Report {} has invalid record_count {}",
                self.id, self.record_count
            ))
        })?;

        let records = match self.records_json {
            Some(json) => Some(
                serde_json::from_str::<Vec<ExtractedRecord>>(&json)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            ),
            None => None,
        };

        Ok(StoredReport {
            id: self.id,
            created_at,
            config_hash: self.config_hash,
            report: RunReport {
                page_count,
                record_count,
                records,
                error_summary: self.error_summary,
            },
        })
    }
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SweepError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Stores a report with an explicit creation time
    pub fn insert_report(
        &mut self,
        report: &RunReport,
        config_hash: &str,
        created_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        let records_json = report
            .records
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO run_reports
                (created_at, page_count, record_count, error_summary, records_json, config_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                report.page_count,
                report.record_count as i64,
                report.error_summary,
                records_json,
                config_hash
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Stored report {} ({} records)", id, report.record_count);
        Ok(id)
    }
}

impl ReportStore for SqliteStorage {
    fn save_report(&mut self, report: &RunReport, config_hash: &str) -> StorageResult<i64> {
        self.insert_report(report, config_hash, Utc::now())
    }

    fn get_report(&self, report_id: i64) -> StorageResult<StoredReport> {
        let sql = format!("SELECT {} FROM run_reports WHERE id = ?1", REPORT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![report_id], ReportRow::from_row)
            .optional()?
            .ok_or(StorageError::ReportNotFound(report_id))?;

        row.decode()
    }

    fn list_reports(&self) -> StorageResult<Vec<StoredReport>> {
        let sql = format!("SELECT {} FROM run_reports ORDER BY id ASC", REPORT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;

        let rows = stmt
            .query_map([], ReportRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ReportRow::decode).collect()
    }

    fn count_reports(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM run_reports", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
