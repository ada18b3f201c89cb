//! San Francisco Police Department crime feed.
//!
//! Uses SF's Socrata Open Data API.
//! Dataset: <https://data.sfgov.org/resource/tmnf-yvry.json>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crime_feed_models::{CanonicalIncident, Source};
use serde::Deserialize;

use crate::{CrimeSource, NormalizeError, RawRecord, SourceError, identity, parsing};

const API_URL: &str = "https://data.sfgov.org/resource/tmnf-yvry.json";

/// Rows per request.
const ROW_LIMIT: u32 = 100;

/// SF Police Department crime feed.
pub struct SfSource;

impl SfSource {
    /// Creates a new SF feed adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SfSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw record shape from the SF feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SfRecord {
    /// Natural primary key.
    #[serde(default)]
    pub incident_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub incident_category: Option<String>,
    #[serde(default)]
    pub intersection: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
}

#[async_trait]
impl CrimeSource for SfSource {
    fn source(&self) -> Source {
        Source::PoliceSf
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let mut url = format!("{API_URL}?$limit={ROW_LIMIT}&$order=date DESC");

        if let Some(since) = since {
            let since_str = since.format("%Y-%m-%dT%H:%M:%S").to_string();
            url.push_str(&format!("&$where=date >= '{since_str}'"));
        }

        log::info!("Fetching SF data (since={since:?})");
        let response = client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        let records: Vec<SfRecord> = super::decode_body(&body)?;

        log::info!("Downloaded {} SF records", records.len());
        Ok(records.into_iter().map(RawRecord::Sf).collect())
    }

    fn normalize(&self, raw: &RawRecord) -> Result<CanonicalIncident, NormalizeError> {
        let RawRecord::Sf(record) = raw else {
            return Err(NormalizeError::SourceMismatch {
                expected: self.source(),
            });
        };

        let natural_id = match record.incident_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(NormalizeError::MissingField {
                field: "incident_id",
            }),
        };

        let (latitude, longitude) =
            parsing::parse_lat_lng_str(record.latitude.as_ref(), record.longitude.as_ref())
                .map_or((None, None), |(la, lo)| (Some(la), Some(lo)));

        Ok(CanonicalIncident {
            incident_id: identity::natural_key(self.source(), natural_id),
            occurred_at: record.date.as_deref().and_then(parsing::parse_feed_date),
            description: record.description.clone().unwrap_or_default(),
            location: record.intersection.clone().unwrap_or_default(),
            crime_type: record.incident_category.clone().unwrap_or_default(),
            source: Source::PoliceSf,
            latitude,
            longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SfRecord {
        SfRecord {
            incident_id: Some("987654".to_string()),
            date: Some("2024-02-20T03:45:00".to_string()),
            description: Some("Vehicle break-in".to_string()),
            incident_category: Some("Larceny Theft".to_string()),
            intersection: Some("MARKET ST \\ 5TH ST".to_string()),
            latitude: Some("37.7837".to_string()),
            longitude: Some("-122.4090".to_string()),
        }
    }

    #[test]
    fn normalizes_record_with_prefixed_identity() {
        let source = SfSource::new();
        let incident = source.normalize(&RawRecord::Sf(record())).unwrap();

        assert_eq!(incident.incident_id, "police_sf_987654");
        assert_eq!(incident.crime_type, "Larceny Theft");
        assert_eq!(incident.location, "MARKET ST \\ 5TH ST");
        assert_eq!(incident.source, Source::PoliceSf);
    }

    #[test]
    fn same_numeric_id_differs_from_chicago() {
        let sf = SfSource::new();
        let chicago = crate::sources::chicago::ChicagoSource::new();

        let sf_incident = sf
            .normalize(&RawRecord::Sf(SfRecord {
                incident_id: Some("42".to_string()),
                ..SfRecord::default()
            }))
            .unwrap();
        let chicago_incident = chicago
            .normalize(&RawRecord::Chicago(crate::sources::chicago::ChicagoRecord {
                id: Some("42".to_string()),
                ..crate::sources::chicago::ChicagoRecord::default()
            }))
            .unwrap();

        assert_ne!(sf_incident.incident_id, chicago_incident.incident_id);
    }

    #[test]
    fn missing_natural_id_is_skipped() {
        let source = SfSource::new();
        let raw = RawRecord::Sf(SfRecord {
            incident_id: Some(String::new()),
            ..record()
        });
        assert!(matches!(
            source.normalize(&raw),
            Err(NormalizeError::MissingField { .. })
        ));
    }
}
