use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Paste-Sift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scan: ScanConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub output: OutputConfig,
}

/// Keyword scanning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Keywords to look for, matched case-insensitively in configured order
    pub keywords: Vec<String>,
}

/// Fetch pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of paste ids taken from the archive
    #[serde(rename = "max-pastes")]
    pub max_pastes: usize,

    /// Minimum time between any two outbound requests (seconds)
    #[serde(rename = "min-request-interval")]
    pub min_request_interval: f64,

    /// Timeout applied to each individual paste fetch (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: f64,

    /// Upper bound on the whole fetch phase (seconds)
    #[serde(rename = "session-timeout")]
    pub session_timeout: f64,

    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-connections")]
    pub max_connections: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Egress proxies, used round-robin. Empty means direct connections.
    pub proxies: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_pastes: 30,
            min_request_interval: 1.0,
            request_timeout: 15.0,
            session_timeout: 20.0,
            max_connections: 10,
            user_agent: "Mozilla/5.0".to_string(),
            proxies: Vec::new(),
        }
    }
}

impl FetchConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_request_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.session_timeout)
    }

    /// Time allowed for fetching `item_count` pastes
    ///
    /// The session timeout starts counting once the rate limiter could have
    /// released the last request, so pacing alone never trips it.
    pub fn session_deadline(&self, item_count: usize) -> Duration {
        let pending = u32::try_from(item_count.saturating_sub(1)).unwrap_or(u32::MAX);
        let pacing = self
            .min_interval()
            .checked_mul(pending)
            .unwrap_or(Duration::MAX);
        self.session_timeout().saturating_add(pacing)
    }
}

/// Where pastes are discovered and fetched from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Origin tag written into every record
    pub name: String,

    /// Listing page of recently published pastes
    #[serde(rename = "archive-url")]
    pub archive_url: String,

    /// Raw paste URL with an `{id}` placeholder
    #[serde(rename = "raw-url-template")]
    pub raw_url_template: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "pastebin".to_string(),
            archive_url: "https://pastebin.com/archive".to_string(),
            raw_url_template: "https://pastebin.com/raw/{id}".to_string(),
        }
    }
}

impl SourceConfig {
    /// Resolves a paste id to its raw URL
    pub fn raw_url(&self, id: &str) -> String {
        self.raw_url_template.replace(ID_PLACEHOLDER, id)
    }
}

/// Placeholder substituted in `raw-url-template`
pub const ID_PLACEHOLDER: &str = "{id}";

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON Lines match file, recreated on every run
    pub path: String,
}
