//! Stage-tagged failure collection
//!
//! Every pipeline stage converts its failures into a [`FailureEntry`] and appends it here.
//! The log never influences control flow; it only accumulates and renders.

use std::fmt;

/// Marker appended to entry text cut at the display limit
const ELLIPSIS: &str = "...";

/// Identifies the pipeline step a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageTag {
    /// Navigation, readiness or visibility wait failed
    Load(u32),
    /// Page loaded but its markup was empty
    Html(u32),
    /// Content was not markup at all
    Parse(u32),
    /// Page-count resolution failed
    PageCount,
    /// Extraction failed for a page
    Extract(u32),
    /// Page loaded fine but yielded zero records
    NoItems(u32),
    /// The browsing session failed to start or died mid-run
    Session,
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(1) => write!(f, "first_page_load"),
            Self::Load(page) => write!(f, "page_{}_load", page),
            Self::Html(1) => write!(f, "first_page_html"),
            Self::Html(page) => write!(f, "page_{}_html", page),
            Self::Parse(1) => write!(f, "first_page_parse"),
            Self::Parse(page) => write!(f, "page_{}_parse", page),
            Self::PageCount => write!(f, "get_page_count"),
            Self::Extract(1) => write!(f, "extract_page_1"),
            Self::Extract(page) => write!(f, "page_{}_extract", page),
            Self::NoItems(page) => write!(f, "page_{}_no_items", page),
            Self::Session => write!(f, "browser_session"),
        }
    }
}

/// What went wrong, independent of where
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Navigation,
    EmptyMarkup,
    MalformedMarkup,
    InvalidCount,
    Panic,
    NoItems,
    Session,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Navigation => "navigation",
            Self::EmptyMarkup => "empty_markup",
            Self::MalformedMarkup => "malformed_markup",
            Self::InvalidCount => "invalid_count",
            Self::Panic => "panic",
            Self::NoItems => "no_items",
            Self::Session => "session",
        };
        write!(f, "{}", name)
    }
}

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub stage: StageTag,
    pub kind: FailureKind,
    pub message: String,
    pub context: Option<String>,
}

impl FailureEntry {
    pub fn new(stage: StageTag, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Message plus context, before truncation
    pub fn detail(&self) -> String {
        match &self.context {
            Some(context) => format!("{} ({})", self.message, context),
            None => self.message.clone(),
        }
    }

    /// Renders the entry as one line with its detail cut to `max_chars` characters
    pub fn render(&self, max_chars: usize) -> String {
        format!(
            "[{}] {}: {}",
            self.stage,
            self.kind,
            truncate_chars(&self.detail(), max_chars)
        )
    }
}

/// Append-only collector of failures for one run
#[derive(Debug, Default, Clone)]
pub struct ErrorLog {
    entries: Vec<FailureEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a failure entry
    pub fn push(&mut self, entry: FailureEntry) {
        tracing::warn!("[{}] {}: {}", entry.stage, entry.kind, entry.detail());
        self.entries.push(entry);
    }

    /// Records a failure for `stage`
    pub fn record(&mut self, stage: StageTag, kind: FailureKind, message: impl Into<String>) {
        self.push(FailureEntry::new(stage, kind, message));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the first `max_shown` entries, one per line, plus an overflow line
    ///
    /// An empty log renders to an empty string.
    pub fn render(&self, max_shown: usize, max_chars: usize) -> String {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .take(max_shown)
            .map(|entry| entry.render(max_chars))
            .collect();

        let hidden = self.entries.len().saturating_sub(max_shown);
        if hidden > 0 {
            lines.push(format!("+{} additional", hidden));
        }

        lines.join("\n")
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with an ellipsis
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}
