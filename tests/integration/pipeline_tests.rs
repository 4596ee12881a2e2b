//! Integration tests for the fetch pipeline
//!
//! These tests use wiremock to stand in for the paste site and run whole
//! harvests end-to-end, plus a few instrumented fetchers to observe
//! concurrency and proxy assignment.

use paste_sift::config::Config;
use paste_sift::discovery::{ArchiveSource, IdentifierSource, StaticSource};
use paste_sift::output::MatchRecord;
use paste_sift::pipeline::{
    build_http_client, fetch_url, FetchOutcome, HttpFetcher, Orchestrator, PasteFetcher,
};
use paste_sift::{RunSummary, SiftError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, output: &Path, extra_fetch: &str) -> Config {
    let content = format!(
        r#"
[scan]
keywords = ["crypto", "bitcoin"]

[fetch]
max-pastes = 30
min-request-interval = 0.0
request-timeout = 2.0
session-timeout = 30.0
max-connections = 5
{extra_fetch}

[source]
name = "pastebin"
archive-url = "{base_url}/archive"
raw-url-template = "{base_url}/raw/{{id}}"

[output]
path = "{output}"
"#,
        extra_fetch = extra_fetch,
        base_url = base_url,
        output = output.display()
    );
    Config::from_toml_str(&content).expect("Failed to build test config")
}

/// Builds archive HTML linking the given ids
fn archive_html(ids: &[&str]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| format!(r#"<tr><td><a href="/{}">Untitled</a></td></tr>"#, id))
        .collect();
    format!(
        r#"<html><body><table class="maintable">{}</table></body></html>"#,
        rows
    )
}

async fn mount_archive(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/archive"))
        .respond_with(ResponseTemplate::new(200).set_body_string(archive_html(ids)))
        .mount(server)
        .await;
}

async fn mount_paste(server: &MockServer, id: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/raw/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn read_records(path: &Path) -> Vec<MatchRecord> {
    std::fs::read_to_string(path)
        .expect("Output file missing")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Malformed output line"))
        .collect()
}

/// Collects the message of every WARN event raised by this crate
#[derive(Clone, Default)]
struct WarningLog(Arc<Mutex<Vec<String>>>);

impl WarningLog {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for WarningLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == Level::WARN && meta.target().starts_with("paste_sift") {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.0);
        }
    }
}

/// Runs a full harvest with the production source and fetcher
async fn run_harvest(config: Config) -> Result<RunSummary, SiftError> {
    let source = ArchiveSource::new(&config.fetch, &config.source)?;
    let fetcher = HttpFetcher::new(&config.fetch, &config.source)?;
    Orchestrator::new(config, source, fetcher).run().await
}

#[tokio::test]
async fn test_single_match_written() {
    let server = MockServer::start().await;
    mount_archive(&server, &["aaaaaaaa"]).await;
    mount_paste(&server, "aaaaaaaa", "check out this bitcoin wallet").await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let config = create_test_config(&server.uri(), &out, "");

    let summary = run_harvest(config).await.expect("Run failed");
    assert_eq!(summary.matched, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.keywords_found, vec!["bitcoin"]);
    assert_eq!(record.item_id, "aaaaaaaa");
    assert_eq!(record.status, "pending");
    assert_eq!(record.source, "pastebin");
    assert_eq!(record.url, format!("{}/raw/aaaaaaaa", server.uri()));
    assert_eq!(
        record.context,
        "Found bitcoin content in Pastebin paste ID aaaaaaaa"
    );
    assert_eq!(record.discovered_at.len(), "2024-01-01T00:00:00Z".len());
    assert!(record.discovered_at.ends_with('Z'));
}

#[tokio::test]
async fn test_fetch_timeout_is_local_failure() {
    let server = MockServer::start().await;
    mount_archive(&server, &["bbbbbbbb"]).await;
    Mock::given(method("GET"))
        .and(path("/raw/bbbbbbbb"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("bitcoin")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let mut config = create_test_config(&server.uri(), &out, "");
    config.fetch.request_timeout = 0.3;

    let warnings = WarningLog::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(warnings.clone()));

    let summary = run_harvest(config)
        .await
        .expect("Per-item timeout must not fail the run");

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.matched, 0);
    assert!(!summary.timed_out);
    assert!(read_records(&out).is_empty());

    let messages = warnings.messages();
    assert_eq!(messages.len(), 1, "warnings: {:?}", messages);
    assert!(messages[0].contains("[bbbbbbbb] fetch error"));
}

#[tokio::test]
async fn test_no_matches_leaves_empty_file() {
    let server = MockServer::start().await;
    mount_archive(&server, &["cccccccc", "dddddddd"]).await;
    mount_paste(&server, "cccccccc", "a recipe for banana bread").await;
    mount_paste(&server, "dddddddd", "fn main() {}").await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let config = create_test_config(&server.uri(), &out, "");

    let summary = run_harvest(config).await.expect("Run failed");

    assert_eq!(summary.checked, 2);
    assert!(out.exists(), "Output file must exist even with zero matches");
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
}

#[tokio::test]
async fn test_http_error_does_not_affect_siblings() {
    let server = MockServer::start().await;
    mount_archive(&server, &["eeeeeeee", "ffffffff", "gggggggg"]).await;
    mount_paste(&server, "eeeeeeee", "CRYPTO giveaway, bitcoin inside").await;
    Mock::given(method("GET"))
        .and(path("/raw/ffffffff"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_paste(&server, "gggggggg", "nothing here").await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let config = create_test_config(&server.uri(), &out, "");

    let summary = run_harvest(config).await.expect("Run failed");

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.checked, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].item_id, "eeeeeeee");
    assert_eq!(records[0].keywords_found, vec!["crypto", "bitcoin"]);
}

#[tokio::test]
async fn test_discovery_http_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archive"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let config = create_test_config(&server.uri(), &out, "");

    let result = run_harvest(config).await;
    assert!(matches!(result, Err(SiftError::Discovery { .. })));
    assert!(!out.exists(), "No output should be attempted after discovery failure");
}

#[tokio::test]
async fn test_archive_source_caps_and_dedupes() {
    let server = MockServer::start().await;
    mount_archive(
        &server,
        &["aaaaaaaa", "bbbbbbbb", "aaaaaaaa", "cccccccc", "dddddddd"],
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("o.jsonl"), "");
    let source = ArchiveSource::new(&config.fetch, &config.source).unwrap();

    let ids = source.list_recent_identifiers(3).await.unwrap();
    assert_eq!(ids, vec!["aaaaaaaa", "bbbbbbbb", "cccccccc"]);
}

#[tokio::test]
async fn test_rerun_produces_fresh_file() {
    let server = MockServer::start().await;
    mount_archive(&server, &["aaaaaaaa"]).await;
    mount_paste(&server, "aaaaaaaa", "bitcoin").await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");

    let config = create_test_config(&server.uri(), &out, "");
    run_harvest(config).await.expect("First run failed");
    assert_eq!(read_records(&out).len(), 1);

    // Second run sees a different archive with no matching pastes
    let second = MockServer::start().await;
    mount_archive(&second, &["hhhhhhhh"]).await;
    mount_paste(&second, "hhhhhhhh", "plain text").await;

    let config = create_test_config(&second.uri(), &out, "");
    run_harvest(config).await.expect("Second run failed");
    assert!(read_records(&out).is_empty());
}

#[tokio::test]
async fn test_session_timeout_drains_cleanly() {
    let server = MockServer::start().await;
    mount_archive(&server, &["iiiiiiii", "jjjjjjjj"]).await;
    mount_paste(&server, "iiiiiiii", "bitcoin").await;
    Mock::given(method("GET"))
        .and(path("/raw/jjjjjjjj"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("bitcoin")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let mut config = create_test_config(&server.uri(), &out, "");
    config.fetch.request_timeout = 10.0;
    config.fetch.session_timeout = 1.0;

    let summary = run_harvest(config)
        .await
        .expect("Session timeout must still drain");

    assert!(summary.timed_out);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.aborted, 1);
    assert_eq!(read_records(&out).len(), 1);
}

#[tokio::test]
async fn test_fetch_url_success_and_status() {
    let server = MockServer::start().await;
    mount_paste(&server, "kkkkkkkk", "hello").await;
    Mock::given(method("GET"))
        .and(path("/raw/gone0000"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let client = build_http_client("Mozilla/5.0", Duration::from_secs(2), None).unwrap();

    let ok = fetch_url(
        &client,
        &format!("{}/raw/kkkkkkkk", server.uri()),
        Duration::from_secs(2),
    )
    .await;
    assert_eq!(
        ok,
        FetchOutcome::Success {
            body: "hello".to_string()
        }
    );

    let gone = fetch_url(
        &client,
        &format!("{}/raw/gone0000", server.uri()),
        Duration::from_secs(2),
    )
    .await;
    assert_eq!(
        gone,
        FetchOutcome::Failure {
            reason: "HTTP 410".to_string()
        }
    );
}

#[tokio::test]
async fn test_unreachable_proxy_is_local_failure() {
    let server = MockServer::start().await;
    mount_archive(&server, &["llllllll"]).await;
    mount_paste(&server, "llllllll", "bitcoin").await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    // Nothing listens on port 9 locally; connecting through it fails fast
    let config = create_test_config(
        &server.uri(),
        &out,
        r#"proxies = ["http://127.0.0.1:9"]"#,
    );

    let summary = run_harvest(config).await.expect("Run failed");
    assert_eq!(summary.failed, 1);
    assert!(read_records(&out).is_empty());
}

/// Counters shared between a test and its GateFetcher
#[derive(Default)]
struct GateStats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

/// Fetcher that tracks how many fetches overlap
struct GateFetcher {
    stats: Arc<GateStats>,
    hold: Duration,
}

impl PasteFetcher for GateFetcher {
    async fn fetch(&self, id: &str, _proxy: Option<&str>) -> FetchOutcome {
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);
        self.stats.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        FetchOutcome::Success {
            body: format!("paste {} mentions crypto", id),
        }
    }
}

#[tokio::test]
async fn test_concurrency_bound_respected() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let config = create_test_config("http://127.0.0.1:1", &out, "");
    assert_eq!(config.fetch.max_connections, 5);

    let ids: Vec<String> = (0..15).map(|i| format!("id{:06}", i)).collect();
    let stats = Arc::new(GateStats::default());
    let fetcher = GateFetcher {
        stats: stats.clone(),
        hold: Duration::from_millis(50),
    };

    let summary = Orchestrator::new(config, StaticSource::new(ids), fetcher)
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.calls.load(Ordering::SeqCst), 15);
    assert_eq!(summary.matched, 15);
    let peak = stats.peak.load(Ordering::SeqCst);
    assert!(peak <= 5, "Peak in-flight fetches was {}", peak);
    assert!(peak >= 2, "Fetches never overlapped (peak {})", peak);
    assert_eq!(read_records(&out).len(), 15);
}

type ProxyLog = Arc<Mutex<Vec<Option<String>>>>;

/// Fetcher that records which proxy each call received
struct RecordingFetcher {
    seen: ProxyLog,
}

impl PasteFetcher for RecordingFetcher {
    async fn fetch(&self, _id: &str, proxy: Option<&str>) -> FetchOutcome {
        self.seen.lock().unwrap().push(proxy.map(str::to_string));
        FetchOutcome::Success {
            body: String::new(),
        }
    }
}

#[tokio::test]
async fn test_proxies_assigned_round_robin() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let config = create_test_config(
        "http://127.0.0.1:1",
        &out,
        r#"proxies = ["http://10.0.0.1:8080", "http://10.0.0.2:8080", "http://10.0.0.3:8080"]"#,
    );

    let ids: Vec<String> = (0..10).map(|i| format!("px{:06}", i)).collect();
    let log = ProxyLog::default();

    Orchestrator::new(config, StaticSource::new(ids), RecordingFetcher { seen: log.clone() })
        .run()
        .await
        .expect("Run failed");

    let seen = log.lock().unwrap();
    assert_eq!(seen.len(), 10);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for proxy in seen.iter() {
        let proxy = proxy.clone().expect("Every call should get a proxy");
        *counts.entry(proxy).or_default() += 1;
    }
    assert_eq!(counts.len(), 3);
    for used in counts.values() {
        assert!(*used == 3 || *used == 4, "Unbalanced proxy use: {:?}", counts);
    }
}

#[tokio::test]
async fn test_no_proxies_means_direct() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let config = create_test_config("http://127.0.0.1:1", &out, "");

    let ids: Vec<String> = (0..4).map(|i| format!("dr{:06}", i)).collect();
    let log = ProxyLog::default();

    Orchestrator::new(config, StaticSource::new(ids), RecordingFetcher { seen: log.clone() })
        .run()
        .await
        .expect("Run failed");

    let seen = log.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(Option::is_none));
}

#[tokio::test]
async fn test_rate_limit_spaces_fetches() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("matches.jsonl");
    let mut config = create_test_config("http://127.0.0.1:1", &out, "");
    config.fetch.min_request_interval = 0.1;

    let ids: Vec<String> = (0..4).map(|i| format!("rl{:06}", i)).collect();
    let stats = Arc::new(GateStats::default());
    let fetcher = GateFetcher {
        stats: stats.clone(),
        hold: Duration::ZERO,
    };

    let start = std::time::Instant::now();
    Orchestrator::new(config, StaticSource::new(ids), fetcher)
        .run()
        .await
        .expect("Run failed");

    // Four requests need three full intervals between first and last
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(stats.calls.load(Ordering::SeqCst), 4);
}
