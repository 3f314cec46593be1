//! Core data models for bug reports.
//!
//! [`BugRecord`] mirrors the subset of a Bugzilla bug dump that the
//! similarity strategies, the evaluation harness, and the tracking
//! classifier read. Every field defaults when absent so partial dumps
//! deserialize cleanly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric bug identifier.
pub type BugId = u64;

/// A single bug report, immutable once loaded for a corpus snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BugRecord {
    pub id: BugId,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub duplicates: Vec<BugId>,
    #[serde(default)]
    pub dupe_of: Option<BugId>,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub whiteboard: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub cf_crash_signature: String,
    #[serde(default)]
    pub cf_has_str: String,
    #[serde(default)]
    pub cf_has_regression_range: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A comment on a bug. The first comment is the bug description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub creator: Option<String>,
}

/// One entry of a bug's change history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub when: Option<DateTime<Utc>>,
    #[serde(default)]
    pub who: String,
    #[serde(default)]
    pub changes: Vec<FieldChange>,
}

/// A single field change within a [`HistoryEntry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_name: String,
    #[serde(default)]
    pub added: String,
    #[serde(default)]
    pub removed: String,
}

/// An attachment; only patch bookkeeping is modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub is_patch: bool,
    #[serde(default)]
    pub is_obsolete: bool,
    #[serde(default)]
    pub content_type: String,
}

impl BugRecord {
    /// Create a bug with a summary and a description (first comment).
    pub fn new(id: BugId, summary: &str, description: &str) -> Self {
        Self {
            id,
            summary: summary.to_string(),
            comments: vec![Comment {
                text: description.to_string(),
                creator: None,
            }],
            ..Default::default()
        }
    }

    /// The free text every strategy indexes: summary plus the first comment.
    ///
    /// Bugs without comments contribute their summary alone.
    pub fn text(&self) -> String {
        match self.comments.first() {
            Some(first) => format!("{} {}", self.summary, first.text),
            None => self.summary.clone(),
        }
    }

    /// Whether the bug carries the given keyword.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }
}
