//! Paste-Sift main entry point
//!
//! This is the command-line interface for the Paste-Sift keyword watcher.

use anyhow::Context;
use clap::Parser;
use paste_sift::config::{load_config_with_hash, Config};
use paste_sift::discovery::StaticSource;
use paste_sift::output::print_summary;
use paste_sift::pipeline::{harvest, HttpFetcher, Orchestrator};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Paste-Sift: a keyword watcher for public paste sites
///
/// Paste-Sift lists the most recent public pastes, fetches each one under a
/// global rate limit, and appends a JSON line for every paste that mentions
/// one of the configured keywords.
#[derive(Parser, Debug)]
#[command(name = "paste-sift")]
#[command(version = "1.0.0")]
#[command(about = "A keyword watcher for public paste sites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write matches here instead of the configured output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Fetch these paste ids instead of listing the archive (comma separated)
    #[arg(long, value_delimiter = ',', value_name = "ID,...")]
    ids: Vec<String>,

    /// Validate config and show what would be fetched without touching the network
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("invalid configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli.ids);
        return Ok(());
    }

    let output_path = config.output.path.clone();
    let summary = if cli.ids.is_empty() {
        harvest(config).await
    } else {
        tracing::info!("Using {} ids from the command line", cli.ids.len());
        let fetcher = HttpFetcher::new(&config.fetch, &config.source)?;
        Orchestrator::new(config, StaticSource::new(cli.ids), fetcher)
            .run()
            .await
    };

    match summary {
        Ok(summary) => {
            if !cli.quiet {
                print_summary(&summary, &output_path);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paste_sift=info,warn"),
            1 => EnvFilter::new("paste_sift=debug,info"),
            2 => EnvFilter::new("paste_sift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config, ids: &[String]) {
    println!("=== Paste-Sift Dry Run ===\n");

    println!("Keywords ({}):", config.scan.keywords.len());
    for keyword in &config.scan.keywords {
        println!("  - {}", keyword);
    }

    println!("\nFetch:");
    println!("  Max pastes: {}", config.fetch.max_pastes);
    println!("  Max connections: {}", config.fetch.max_connections);
    println!(
        "  Min request interval: {}s",
        config.fetch.min_request_interval
    );
    println!("  Request timeout: {}s", config.fetch.request_timeout);
    println!("  Session timeout: {}s", config.fetch.session_timeout);
    println!("  User agent: {}", config.fetch.user_agent);

    println!("\nProxies ({}):", config.fetch.proxies.len());
    if config.fetch.proxies.is_empty() {
        println!("  (direct connections)");
    }
    for proxy in &config.fetch.proxies {
        println!("  - {}", proxy);
    }

    println!("\nSource:");
    println!("  Name: {}", config.source.name);
    if ids.is_empty() {
        println!("  Archive: {}", config.source.archive_url);
    } else {
        println!("  Ids: {}", ids.join(", "));
    }
    println!("  Raw URL: {}", config.source.raw_url_template);

    println!("\nOutput: {}", config.output.path);

    println!("\n✓ Configuration is valid");
}
