#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime feed adapter trait and per-source normalization logic.
//!
//! Each external provider implements [`CrimeSource`] to define how raw
//! records are fetched and mapped to the canonical
//! [`CanonicalIncident`] shape. Raw records are carried as a tagged
//! [`RawRecord`] variant per source rather than untyped JSON, so
//! `normalize` is the single validated boundary between a feed's native
//! field names and the canonical schema.

pub mod identity;
pub mod parsing;
pub mod sources;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crime_feed_models::{CanonicalIncident, Source};

use crate::sources::chicago::ChicagoRecord;
use crate::sources::newsapi::NewsArticle;
use crate::sources::sf::SfRecord;

/// Errors that can occur while fetching from a source.
///
/// These are source-local: the pipeline catches them at the adapter
/// boundary, logs, and degrades that source to an empty batch. A failing
/// source never aborts ingestion from the others.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (network error, timeout, or non-success
    /// status).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source reported an application-level error in its body.
    #[error("Source error: {message}")]
    Api {
        /// Error message reported by the source.
        message: String,
    },

    /// A credential this source requires is not configured.
    #[error("Missing credential: {key} is not set")]
    MissingCredential {
        /// Environment variable that was expected.
        key: &'static str,
    },
}

/// Reason a single raw record was skipped during normalization.
///
/// Record-local: the pipeline counts and logs skips and continues with
/// the rest of the batch.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The raw record variant belongs to a different source.
    #[error("record is not from {expected}")]
    SourceMismatch {
        /// Source whose adapter was asked to normalize the record.
        expected: Source,
    },

    /// A field required for identity is missing or empty.
    #[error("missing {field}")]
    MissingField {
        /// Name of the missing source-native field.
        field: &'static str,
    },
}

/// A source-native record, tagged by origin.
///
/// Each variant holds the serde-typed shape of one feed's JSON, parsed
/// but not yet validated or mapped to canonical fields.
#[derive(Debug, Clone)]
pub enum RawRecord {
    /// An article from the NewsAPI search endpoint.
    News(NewsArticle),
    /// A record from the Chicago open-data feed.
    Chicago(ChicagoRecord),
    /// A record from the San Francisco open-data feed.
    Sf(SfRecord),
}

/// Trait that all crime feed sources implement.
///
/// `fetch` requests only records at or after `since` when one is given;
/// `None` means the source-defined default window (most recent page).
/// `normalize` maps one raw record into the canonical attribute set,
/// resolving its identity key along the way.
#[async_trait]
pub trait CrimeSource: Send + Sync {
    /// Returns the origin tag for this source.
    fn source(&self) -> Source;

    /// Fetches raw records from the source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request, response status, or body
    /// parsing fails.
    async fn fetch(
        &self,
        client: &reqwest::Client,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, SourceError>;

    /// Maps one raw record to the canonical schema.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the record belongs to a different
    /// source or lacks the field its identity is keyed on.
    fn normalize(&self, raw: &RawRecord) -> Result<CanonicalIncident, NormalizeError>;
}

/// Returns all configured feed adapters, in sync order.
///
/// The news adapter reads its API key from the `NEWS_API_KEY`
/// environment variable; a missing key surfaces as a
/// [`SourceError::MissingCredential`] on fetch, which the pipeline
/// treats like any other source-local failure.
#[must_use]
pub fn all_sources() -> Vec<Box<dyn CrimeSource>> {
    vec![
        Box::new(sources::newsapi::NewsApiSource::from_env()),
        Box::new(sources::chicago::ChicagoSource::new()),
        Box::new(sources::sf::SfSource::new()),
    ]
}

/// Returns the sources to sync, filtered by the `--sources` CLI flag or
/// the `CRIME_FEED_SOURCES` environment variable. If neither is set, all
/// sources are returned.
#[must_use]
pub fn enabled_sources(cli_filter: Option<String>) -> Vec<Box<dyn CrimeSource>> {
    let filter = cli_filter.or_else(|| std::env::var("CRIME_FEED_SOURCES").ok());

    let all = all_sources();

    let Some(filter_str) = filter else {
        return all;
    };

    let tags: Vec<&str> = filter_str.split(',').map(str::trim).collect();

    let filtered: Vec<Box<dyn CrimeSource>> = all
        .into_iter()
        .filter(|s| tags.contains(&s.source().as_ref()))
        .collect();

    if filtered.is_empty() {
        log::warn!(
            "No matching sources found for filter {:?}. Available: {}",
            tags,
            Source::all()
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_covers_every_tag() {
        let adapters = all_sources();
        let tags: Vec<Source> = adapters.iter().map(|a| a.source()).collect();
        assert_eq!(tags, Source::all());
    }

    #[test]
    fn filter_selects_named_sources() {
        let filtered = enabled_sources(Some("police_chicago,police_sf".to_string()));
        let tags: Vec<Source> = filtered.iter().map(|a| a.source()).collect();
        assert_eq!(tags, vec![Source::PoliceChicago, Source::PoliceSf]);
    }

    #[test]
    fn unknown_filter_yields_empty() {
        assert!(enabled_sources(Some("police_gotham".to_string())).is_empty());
    }
}
