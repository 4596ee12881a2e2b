//! HTTP fetcher implementation
//!
//! This module handles paste retrieval, including:
//! - Building HTTP clients with the configured user agent and proxy
//! - Resolving paste ids to raw URLs
//! - Per-request timeouts
//! - Error classification into a local [`FetchOutcome::Failure`]

use crate::config::{FetchConfig, SourceConfig};
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Result of a fetch operation
///
/// A fetch is all or nothing: either the complete body or a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The full response body
    Success { body: String },

    /// Timeout, connection or proxy failure, HTTP error status, or undecodable body
    Failure { reason: String },
}

/// Retrieves one paste body
///
/// Implementations must never panic or return early on network errors;
/// every problem is reported as [`FetchOutcome::Failure`] for that id only.
pub trait PasteFetcher: Send + Sync + 'static {
    /// Fetches paste `id`, through `proxy` when given, otherwise directly
    fn fetch(&self, id: &str, proxy: Option<&str>) -> impl Future<Output = FetchOutcome> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Value for the User-Agent header
/// * `timeout` - Per-request timeout, also used as the connect timeout
/// * `proxy` - Optional proxy URI every request of this client goes through
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (e.g. unparsable proxy)
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true);

    if let Some(uri) = proxy {
        builder = builder.proxy(Proxy::all(uri)?);
    }

    builder.build()
}

/// Fetches a URL and classifies the result
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | 2xx with decodable body | Success |
/// | Non-2xx status | Failure ("HTTP 404") |
/// | Timeout | Failure ("Request timeout") |
/// | Connection / proxy refused | Failure ("Connection failed: ...") |
/// | Body not decodable as text | Failure ("Undecodable response: ...") |
///
/// No retries are attempted.
pub async fn fetch_url(client: &Client, url: &str, timeout: Duration) -> FetchOutcome {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome::Failure {
                reason: describe_error(&e),
            }
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchOutcome::Failure {
            reason: format!("HTTP {}", status.as_u16()),
        };
    }

    match response.text().await {
        Ok(body) => FetchOutcome::Success { body },
        Err(e) => FetchOutcome::Failure {
            reason: describe_error(&e),
        },
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_decode() || e.is_body() {
        format!("Undecodable response: {}", e)
    } else {
        e.to_string()
    }
}

/// Production fetcher backed by reqwest
///
/// reqwest binds proxies per client, so one client is built for every proxy
/// in the pool plus one for direct connections. All of them are dropped
/// together when the fetcher is dropped at the end of the run.
pub struct HttpFetcher {
    source: SourceConfig,
    direct: Client,
    proxied: HashMap<String, Client>,
    request_timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher for the configured source and proxy pool
    pub fn new(fetch: &FetchConfig, source: &SourceConfig) -> Result<Self, reqwest::Error> {
        let request_timeout = fetch.request_timeout();
        let direct = build_http_client(&fetch.user_agent, request_timeout, None)?;

        let mut proxied = HashMap::new();
        for uri in &fetch.proxies {
            let client = build_http_client(&fetch.user_agent, request_timeout, Some(uri))?;
            proxied.insert(uri.clone(), client);
        }

        Ok(Self {
            source: source.clone(),
            direct,
            proxied,
            request_timeout,
        })
    }

    fn client_for(&self, proxy: Option<&str>) -> Option<&Client> {
        match proxy {
            None => Some(&self.direct),
            Some(uri) => self.proxied.get(uri),
        }
    }
}

impl PasteFetcher for HttpFetcher {
    async fn fetch(&self, id: &str, proxy: Option<&str>) -> FetchOutcome {
        let url = self.source.raw_url(id);
        match self.client_for(proxy) {
            Some(client) => fetch_url(client, &url, self.request_timeout).await,
            None => FetchOutcome::Failure {
                reason: format!("No client configured for proxy {}", proxy.unwrap_or("")),
            },
        }
    }
}
