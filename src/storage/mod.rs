//! Storage module for persisting run reports
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Timestamped report persistence
//! - Reading back report history

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ReportStore, StorageError, StorageResult};

use crate::report::RunReport;
use crate::SweepError;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SweepError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SweepError> {
    SqliteStorage::new(path)
}

/// A run report as stored in the database
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub config_hash: String,
    pub report: RunReport,
}

impl StoredReport {
    /// Creation time in UTC, e.g. `2024-05-01T08:30:00Z`
    pub fn created_at_utc(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Creation time at a fixed local offset, e.g. `2024-05-01T09:30:00+01:00`
    pub fn created_at_local(&self, offset: FixedOffset) -> String {
        self.created_at
            .with_timezone(&offset)
            .to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}
