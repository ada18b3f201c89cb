//! Chicago Police Department crime feed.
//!
//! Uses the City of Chicago's Socrata Open Data API.
//! Dataset: <https://data.cityofchicago.org/resource/crimes.json>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crime_feed_models::{CanonicalIncident, Source};
use serde::Deserialize;

use crate::{CrimeSource, NormalizeError, RawRecord, SourceError, identity, parsing};

const API_URL: &str = "https://data.cityofchicago.org/resource/crimes.json";

/// Rows per request.
const ROW_LIMIT: u32 = 100;

/// Chicago PD crime feed.
pub struct ChicagoSource;

impl ChicagoSource {
    /// Creates a new Chicago feed adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ChicagoSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw record shape from the Chicago feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChicagoRecord {
    /// Natural primary key.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_type: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
}

#[async_trait]
impl CrimeSource for ChicagoSource {
    fn source(&self) -> Source {
        Source::PoliceChicago
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let mut url = format!("{API_URL}?$limit={ROW_LIMIT}&$order=:id");

        if let Some(since) = since {
            let since_str = since.format("%Y-%m-%dT%H:%M:%S").to_string();
            url.push_str(&format!("&$where=date >= '{since_str}'"));
        }

        log::info!("Fetching Chicago data (since={since:?})");
        let response = client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        let records: Vec<ChicagoRecord> = super::decode_body(&body)?;

        log::info!("Downloaded {} Chicago records", records.len());
        Ok(records.into_iter().map(RawRecord::Chicago).collect())
    }

    fn normalize(&self, raw: &RawRecord) -> Result<CanonicalIncident, NormalizeError> {
        let RawRecord::Chicago(record) = raw else {
            return Err(NormalizeError::SourceMismatch {
                expected: self.source(),
            });
        };

        let natural_id = match record.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(NormalizeError::MissingField { field: "id" }),
        };

        let (latitude, longitude) =
            parsing::parse_lat_lng_str(record.latitude.as_ref(), record.longitude.as_ref())
                .map_or((None, None), |(la, lo)| (Some(la), Some(lo)));

        Ok(CanonicalIncident {
            incident_id: identity::natural_key(self.source(), natural_id),
            occurred_at: record.date.as_deref().and_then(parsing::parse_feed_date),
            description: record.description.clone().unwrap_or_default(),
            location: record.block.clone().unwrap_or_default(),
            crime_type: record.primary_type.clone().unwrap_or_default(),
            source: Source::PoliceChicago,
            latitude,
            longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ChicagoRecord {
        ChicagoRecord {
            id: Some("13012345".to_string()),
            date: Some("2024-03-10T21:15:00.000".to_string()),
            description: Some("POCKET-PICKING".to_string()),
            primary_type: Some("THEFT".to_string()),
            block: Some("100 N STATE ST".to_string()),
            latitude: Some("41.8827".to_string()),
            longitude: Some("-87.6278".to_string()),
        }
    }

    #[test]
    fn normalizes_record_with_prefixed_identity() {
        let source = ChicagoSource::new();
        let incident = source.normalize(&RawRecord::Chicago(record())).unwrap();

        assert_eq!(incident.incident_id, "police_chicago_13012345");
        assert_eq!(incident.crime_type, "THEFT");
        assert_eq!(incident.location, "100 N STATE ST");
        assert_eq!(incident.source, Source::PoliceChicago);
        assert!((incident.latitude.unwrap() - 41.8827).abs() < f64::EPSILON);
        assert_eq!(
            incident.occurred_at.unwrap().to_string(),
            "2024-03-10 21:15:00 UTC"
        );
    }

    #[test]
    fn missing_natural_id_is_skipped() {
        let source = ChicagoSource::new();
        let raw = RawRecord::Chicago(ChicagoRecord {
            id: None,
            ..record()
        });
        assert!(matches!(
            source.normalize(&raw),
            Err(NormalizeError::MissingField { field: "id" })
        ));
    }

    #[test]
    fn zero_coordinates_become_none() {
        let source = ChicagoSource::new();
        let raw = RawRecord::Chicago(ChicagoRecord {
            latitude: Some("0.0".to_string()),
            ..record()
        });
        let incident = source.normalize(&raw).unwrap();
        assert!(incident.latitude.is_none());
        assert!(incident.longitude.is_none());
    }

    #[test]
    fn unparseable_date_is_stored_dateless() {
        let source = ChicagoSource::new();
        let raw = RawRecord::Chicago(ChicagoRecord {
            date: Some("03/10/2024".to_string()),
            ..record()
        });
        let incident = source.normalize(&raw).unwrap();
        assert!(incident.occurred_at.is_none());
    }
}
