#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline orchestration: fetch, normalize, merge, and store.
//!
//! One run walks every enabled source: reads its watermark, fetches
//! records at or after it, normalizes them, merges all batches, and
//! hands the result to the store's idempotent insert. Each source then
//! gets its status row advanced exactly once — success with the count
//! of rows it newly persisted, or failure with zero.
//!
//! Failure handling is deliberately partial: a fetch error degrades that
//! source to an empty batch, a bad record is skipped; only a broken
//! store aborts the run.

pub mod merge;

use crime_feed_database::{DbError, queries};
use crime_feed_models::{FetchStatus, Source};
use crime_feed_source::CrimeSource;
use switchy_database::Database;

/// What happened to one source during a run.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    /// Which source.
    pub source: Source,
    /// Success or failure of the fetch attempt.
    pub status: FetchStatus,
    /// Raw records the fetch returned.
    pub fetched: usize,
    /// Records skipped during normalization (missing identity fields).
    pub skipped: u64,
    /// Incidents newly persisted for this source.
    pub inserted: u64,
}

/// Summary of one complete pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-source outcomes, in sync order.
    pub outcomes: Vec<SourceOutcome>,
    /// Incidents newly persisted across all sources.
    pub inserted: u64,
    /// Incidents whose identity was already stored (no-ops).
    pub duplicates: u64,
    /// Records dropped by merge validation or store-level rejection.
    pub dropped: u64,
}

/// Runs the full ingestion pipeline over the given adapters.
///
/// # Errors
///
/// Returns [`DbError`] if the store itself fails; source and record
/// failures are absorbed into the report.
pub async fn run(
    db: &dyn Database,
    adapters: &[Box<dyn CrimeSource>],
    client: &reqwest::Client,
) -> Result<RunReport, DbError> {
    let mut batches = Vec::with_capacity(adapters.len());
    let mut fetch_outcomes = Vec::with_capacity(adapters.len());

    for adapter in adapters {
        let source = adapter.source();
        let since = queries::max_occurred_at(db, source).await?;

        match adapter.fetch(client, since).await {
            Ok(raws) => {
                let fetched = raws.len();
                let (batch, skipped) = normalize_batch(adapter.as_ref(), &raws);
                log::info!(
                    "{source}: fetched {fetched} record(s), normalized {} (skipped {skipped})",
                    batch.len()
                );
                fetch_outcomes.push((source, FetchStatus::Success, fetched, skipped));
                batches.push(batch);
            }
            Err(e) => {
                log::error!("{source}: fetch failed: {e}");
                fetch_outcomes.push((source, FetchStatus::Failure, 0, 0));
                batches.push(Vec::new());
            }
        }
    }

    let merged = merge::merge(batches);
    let outcome = queries::insert_if_absent(db, &merged.incidents).await?;

    let mut report = RunReport {
        inserted: outcome.inserted,
        duplicates: outcome.skipped,
        dropped: merged.dropped + outcome.failed,
        ..RunReport::default()
    };

    for (source, status, fetched, skipped) in fetch_outcomes {
        let inserted = match status {
            FetchStatus::Success => outcome.per_source.get(&source).copied().unwrap_or(0),
            FetchStatus::Failure => 0,
        };

        queries::upsert_status(db, source, status, i64::try_from(inserted).unwrap_or(i64::MAX))
            .await?;

        report.outcomes.push(SourceOutcome {
            source,
            status,
            fetched,
            skipped,
            inserted,
        });
    }

    log::info!(
        "Run complete: {} inserted, {} duplicate(s) skipped, {} dropped",
        report.inserted,
        report.duplicates,
        report.dropped
    );

    Ok(report)
}

/// Normalizes one source's raw records, skipping bad ones.
fn normalize_batch(
    adapter: &dyn CrimeSource,
    raws: &[crime_feed_source::RawRecord],
) -> (Vec<crime_feed_models::CanonicalIncident>, u64) {
    let mut batch = Vec::with_capacity(raws.len());
    let mut skipped = 0u64;

    for raw in raws {
        match adapter.normalize(raw) {
            Ok(incident) => batch.push(incident),
            Err(e) => {
                log::warn!("{}: skipping record: {e}", adapter.source());
                skipped += 1;
            }
        }
    }

    (batch, skipped)
}
