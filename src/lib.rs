//! Pagesweep: a resilient paginated listing scraper
//!
//! This crate walks every page of a paginated listing site inside one browsing session,
//! extracts structured records from the listing cards on each page, and always produces a
//! single run report, even when individual pages or pipeline stages fail.

pub mod config;
pub mod crawler;
pub mod report;
pub mod session;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Pagesweep operations
///
/// A scrape run itself never fails (see [`crawler::Coordinator::run`]); these errors cover
/// the setup and persistence around a run.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {field}: {selector}")]
    InvalidSelector { field: &'static str, selector: String },

    #[error("Invalid UTC offset '{0}', expected ±HH:MM")]
    InvalidOffset(String),
}

/// Result type alias for Pagesweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use report::{ExtractedRecord, RunReport};
pub use state::RunPhase;
