//! Archive page discovery
//!
//! Lists recent paste ids by scraping the public archive table.

use crate::config::{FetchConfig, SourceConfig};
use crate::discovery::IdentifierSource;
use crate::pipeline::build_http_client;
use crate::SiftError;
use reqwest::Client;
use scraper::{Html, Selector};

/// Paste ids on the archive are exactly this many characters
pub const PASTE_ID_LEN: usize = 8;

/// Extracts paste ids from archive HTML
///
/// # Extraction Rules
///
/// - Only `<a>` elements inside `table.maintable` are considered
/// - The href must be site-relative (start with `/`)
/// - After trimming slashes the remaining id must be exactly 8 characters
/// - Ids are deduplicated, first occurrence wins
/// - Extraction stops once `max_count` ids were collected
///
/// # Example
///
/// ```
/// use paste_sift::discovery::parse_archive_ids;
///
/// let html = r#"<table class="maintable"><tr><td><a href="/Ab3dE6gH">x</a></td></tr></table>"#;
/// assert_eq!(parse_archive_ids(html, 10), vec!["Ab3dE6gH"]);
/// ```
pub fn parse_archive_ids(html: &str, max_count: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("table.maintable a") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut ids: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        if ids.len() >= max_count {
            break;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !href.starts_with('/') {
            continue;
        }

        let id = href.trim_matches('/');
        if id.chars().count() == PASTE_ID_LEN && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }

    ids
}

/// Discovers paste ids from the configured archive page
pub struct ArchiveSource {
    client: Client,
    archive_url: String,
}

impl ArchiveSource {
    /// Creates a source using a direct (non-proxied) client
    pub fn new(fetch: &FetchConfig, source: &SourceConfig) -> Result<Self, SiftError> {
        let client = build_http_client(&fetch.user_agent, fetch.request_timeout(), None)?;
        Ok(Self {
            client,
            archive_url: source.archive_url.clone(),
        })
    }

    fn discovery_error(&self, message: impl Into<String>) -> SiftError {
        SiftError::Discovery {
            url: self.archive_url.clone(),
            message: message.into(),
        }
    }
}

impl IdentifierSource for ArchiveSource {
    async fn list_recent_identifiers(&self, max_count: usize) -> Result<Vec<String>, SiftError> {
        let response = self
            .client
            .get(&self.archive_url)
            .send()
            .await
            .map_err(|e| self.discovery_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.discovery_error(format!("HTTP {}", status.as_u16())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| self.discovery_error(e.to_string()))?;

        let ids = parse_archive_ids(&html, max_count);
        tracing::info!("Fetched {} paste IDs from archive", ids.len());
        Ok(ids)
    }
}
