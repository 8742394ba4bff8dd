//! Run reporting
//!
//! This module collects everything a run produces:
//! - `ErrorLog`: append-only, stage-tagged failure entries with bounded rendering
//! - `RunReport`: the single value a run returns, handed on to persistence

mod error_log;
mod run_report;

pub use error_log::{ErrorLog, FailureEntry, FailureKind, StageTag};
pub use run_report::{ExtractedRecord, RunReport};
