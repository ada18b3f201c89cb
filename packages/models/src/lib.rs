#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical incident model shared by every crime feed component.
//!
//! All data sources produce [`CanonicalIncident`] records after mapping
//! their source-specific field names; the ingestion store persists them
//! keyed by `incident_id` and keeps one [`SourceStatus`] snapshot per
//! [`Source`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Origin tag for an incident. Doubles as the prefix for natural
/// incident keys, so two sources reusing the same small numeric ID can
/// never collide in the store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Source {
    /// NewsAPI article search
    Newsapi,
    /// Chicago open-data police feed
    PoliceChicago,
    /// San Francisco open-data police feed
    PoliceSf,
}

impl Source {
    /// All sources the pipeline knows about, in sync order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Newsapi, Self::PoliceChicago, Self::PoliceSf]
    }
}

/// Outcome of the most recent fetch attempt for a source.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetchStatus {
    /// The fetch completed and its incidents were handed to the store.
    Success,
    /// The fetch failed; no incidents from this source this run.
    Failure,
}

/// A crime incident normalized to the canonical schema.
///
/// `incident_id` is the identity key: either a source-native ID prefixed
/// with the [`Source`] tag, or a content-derived sha256 digest for
/// sources without a natural key. Recomputing it from the same raw
/// record always yields the same value, so overlapping fetch windows are
/// safe to re-ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalIncident {
    /// Globally unique identity key.
    pub incident_id: String,
    /// Source-reported event or publication time. `None` when the raw
    /// record has a missing or unparseable date field; such records are
    /// stored but excluded from watermark computation.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Free-text description. May be empty.
    pub description: String,
    /// Free-text location label (address, intersection, or publisher
    /// name). No structured geocoding.
    pub location: String,
    /// Source-specific crime category. No controlled taxonomy.
    pub crime_type: String,
    /// Which feed this record came from.
    pub source: Source,
    /// Latitude (WGS84). `None` if the source lacks coordinates.
    pub latitude: Option<f64>,
    /// Longitude (WGS84). `None` if the source lacks coordinates.
    pub longitude: Option<f64>,
}

/// Current-state snapshot of a source's most recent fetch attempt.
///
/// Replaced wholesale after every run; this is not a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    /// Which source this row describes.
    pub source: Source,
    /// When the most recent fetch attempt completed.
    pub last_fetch: DateTime<Utc>,
    /// Whether that attempt succeeded.
    pub status: FetchStatus,
    /// Incidents newly persisted by that attempt.
    pub records_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tags_round_trip() {
        for source in Source::all() {
            let tag = source.to_string();
            assert_eq!(tag.parse::<Source>().unwrap(), source);
        }
    }

    #[test]
    fn source_tags_are_snake_case() {
        assert_eq!(Source::Newsapi.as_ref(), "newsapi");
        assert_eq!(Source::PoliceChicago.as_ref(), "police_chicago");
        assert_eq!(Source::PoliceSf.as_ref(), "police_sf");
    }

    #[test]
    fn fetch_status_round_trips() {
        assert_eq!(FetchStatus::Success.as_ref(), "success");
        assert_eq!("failure".parse::<FetchStatus>().unwrap(), FetchStatus::Failure);
    }

    #[test]
    fn incident_serializes_camel_case() {
        let incident = CanonicalIncident {
            incident_id: "police_chicago_1".to_string(),
            occurred_at: None,
            description: String::new(),
            location: "100 N STATE ST".to_string(),
            crime_type: "THEFT".to_string(),
            source: Source::PoliceChicago,
            latitude: None,
            longitude: None,
        };
        let json = serde_json::to_value(&incident).unwrap();
        assert_eq!(json["incidentId"], "police_chicago_1");
        assert_eq!(json["source"], "police_chicago");
    }
}
