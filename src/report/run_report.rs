use crate::config::ReportConfig;
use crate::report::ErrorLog;
use serde::{Deserialize, Serialize};

/// One listing card's data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// 1-based position among the kept cards of its page
    pub index: u32,

    /// Non-empty text fragments in document order
    pub fields: Vec<String>,
}

/// The single value a run produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Pages the listing was found to have (at least 1)
    pub page_count: u32,

    /// Records extracted across all pages
    pub record_count: usize,

    /// Every extracted record, when the report policy includes them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<ExtractedRecord>>,

    /// Rendered failure summary; empty when nothing failed
    pub error_summary: String,
}

impl RunReport {
    /// Folds a run's records and error log into a report
    pub fn assemble(
        page_count: u32,
        records: Vec<ExtractedRecord>,
        errors: &ErrorLog,
        policy: &ReportConfig,
    ) -> Self {
        let record_count = records.len();
        Self {
            page_count: page_count.max(1),
            record_count,
            records: policy.include_records.then_some(records),
            error_summary: errors.render(policy.max_shown, policy.max_entry_chars),
        }
    }

    /// True when no failure was recorded during the run
    pub fn is_clean(&self) -> bool {
        self.error_summary.is_empty()
    }
}
