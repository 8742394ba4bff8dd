//! Storage traits and error types
//!
//! This module defines the trait interface for report stores and
//! associated error types.

use crate::report::RunReport;
use crate::storage::StoredReport;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Report not found: {0}")]
    ReportNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run report persistence
///
/// Reports are written once and never updated. The scraper itself never reads them back;
/// reading is for history listings and other consumers.
pub trait ReportStore {
    /// Stores a finished run's report, timestamped now
    ///
    /// # Arguments
    ///
    /// * `report` - The run report
    /// * `config_hash` - Hash of the configuration the run used
    ///
    /// # Returns
    ///
    /// The ID of the stored report
    fn save_report(&mut self, report: &RunReport, config_hash: &str) -> StorageResult<i64>;

    /// Gets a stored report by ID
    fn get_report(&self, report_id: i64) -> StorageResult<StoredReport>;

    /// Lists every stored report, oldest first
    fn list_reports(&self) -> StorageResult<Vec<StoredReport>>;

    /// Counts stored reports
    fn count_reports(&self) -> StorageResult<u64>;
}
