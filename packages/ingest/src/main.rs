#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime feed ingestion tool.

use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use crime_feed_database::{db, queries};
use crime_feed_models::Source;
use crime_feed_source::enabled_sources;

/// Default HTTP timeout when `CRIME_FEED_HTTP_TIMEOUT_SECS` is not set.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser)]
#[command(name = "crime_feed_ingest", about = "Crime feed ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize, and store incidents from every enabled source
    Run {
        /// Comma-separated list of source tags to sync (overrides the
        /// `CRIME_FEED_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
    },
    /// List all configured sources
    Sources,
    /// Show the per-source status snapshot from the last run
    Status,
    /// List stored incidents for one source, newest first
    List {
        /// Source tag (e.g., "`police_chicago`")
        source: String,
        /// Lower `occurred_at` bound (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Upper `occurred_at` bound (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Maximum rows to print
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { sources: None }) {
        Commands::Run { sources } => {
            let db = db::open_from_env().await?;
            let client = http_client()?;
            let adapters = enabled_sources(sources);

            log::info!(
                "Running ingestion for {} source(s): {}",
                adapters.len(),
                adapters
                    .iter()
                    .map(|a| a.source().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let start = Instant::now();
            let report = crime_feed_ingest::run(db.as_ref(), &adapters, &client).await?;
            let elapsed = start.elapsed();

            println!(
                "{:<16} {:<8} {:>8} {:>8} {:>8}",
                "SOURCE", "STATUS", "FETCHED", "SKIPPED", "INSERTED"
            );
            println!("{}", "-".repeat(52));
            for outcome in &report.outcomes {
                println!(
                    "{:<16} {:<8} {:>8} {:>8} {:>8}",
                    outcome.source.as_ref(),
                    outcome.status.as_ref(),
                    outcome.fetched,
                    outcome.skipped,
                    outcome.inserted
                );
            }
            println!(
                "\n{} inserted, {} duplicate(s), {} dropped in {:.1}s",
                report.inserted,
                report.duplicates,
                report.dropped,
                elapsed.as_secs_f64()
            );
        }
        Commands::Sources => {
            println!("{:<16} SOURCE", "TAG");
            println!("{}", "-".repeat(40));
            for source in Source::all() {
                println!("{:<16} {source:?}", source.as_ref());
            }
        }
        Commands::Status => {
            let db = db::open_from_env().await?;
            let statuses = queries::get_statuses(db.as_ref()).await?;

            if statuses.is_empty() {
                println!("No sources have been ingested yet.");
                return Ok(());
            }

            println!(
                "{:<16} {:<8} {:>8}  LAST FETCH",
                "SOURCE", "STATUS", "RECORDS"
            );
            println!("{}", "-".repeat(60));
            for status in &statuses {
                println!(
                    "{:<16} {:<8} {:>8}  {}",
                    status.source.as_ref(),
                    status.status.as_ref(),
                    status.records_count,
                    status.last_fetch.to_rfc3339()
                );
            }
        }
        Commands::List {
            source,
            from,
            to,
            limit,
        } => {
            let source: Source = source
                .parse()
                .map_err(|_| format!("Unknown source: {source}"))?;
            let from = from.as_deref().map(parse_bound).transpose()?;
            let to = to.as_deref().map(parse_bound).transpose()?;

            let db = db::open_from_env().await?;
            let incidents =
                queries::incidents_for_source(db.as_ref(), source, from, to, limit).await?;

            for incident in &incidents {
                println!(
                    "{}  {}  [{}]  {}",
                    incident
                        .occurred_at
                        .map_or_else(|| "(no date)".to_string(), |t| t.to_rfc3339()),
                    incident.incident_id,
                    incident.crime_type,
                    incident.location
                );
            }
            println!("\n{} incident(s)", incidents.len());
        }
    }

    Ok(())
}

/// Builds the HTTP client used by every adapter, with the externally
/// configured request timeout.
fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    let timeout_secs = std::env::var("CRIME_FEED_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    reqwest::Client::builder()
        .user_agent("crime-feed/0.1")
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Parses a CLI date bound: RFC 3339, or a bare date taken as UTC
/// midnight.
fn parse_bound(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(format!("Unparseable date: {s}"))
}
