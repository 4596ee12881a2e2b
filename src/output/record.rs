//! Match records written to the output file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status given to every new record; downstream triage moves it on
pub const STATUS_PENDING: &str = "pending";

/// Timestamp layout for `discovered_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One keyword hit, serialized as a single JSON line
///
/// Field order matches the on-disk layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Origin system tag (e.g. "pastebin")
    pub source: String,

    /// Human-readable summary naming the keywords and paste id
    pub context: String,

    /// The paste id
    pub item_id: String,

    /// Fully resolved raw paste URL
    pub url: String,

    /// UTC time the paste was scanned, second precision
    pub discovered_at: String,

    /// Matched keywords, in configured order, never empty
    pub keywords_found: Vec<String>,

    /// Triage status, always "pending" when written
    pub status: String,
}

impl MatchRecord {
    /// Builds a record for a scanned paste
    ///
    /// Returns `None` when nothing matched, so a record with an empty
    /// `keywords_found` can never be constructed through this path.
    pub fn build(
        source: &str,
        item_id: &str,
        url: &str,
        keywords_found: Vec<String>,
        scanned_at: DateTime<Utc>,
    ) -> Option<Self> {
        if keywords_found.is_empty() {
            return None;
        }

        let context = format!(
            "Found {} content in {} paste ID {}",
            keywords_found.join(", "),
            display_name(source),
            item_id
        );

        Some(Self {
            source: source.to_string(),
            context,
            item_id: item_id.to_string(),
            url: url.to_string(),
            discovered_at: scanned_at.format(TIMESTAMP_FORMAT).to_string(),
            keywords_found,
            status: STATUS_PENDING.to_string(),
        })
    }
}

/// "pastebin" -> "Pastebin"
fn display_name(source: &str) -> String {
    let mut chars = source.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
