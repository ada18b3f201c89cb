//! Store queries: idempotent incident insertion, watermark reads, and
//! source status bookkeeping.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text
//! (`2024-01-01T00:00:00Z`), so SQL `MAX` over the column matches
//! chronological order.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use crime_feed_models::{CanonicalIncident, FetchStatus, Source, SourceStatus};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Formats a timestamp for storage.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a stored timestamp. `None` on malformed text rather than an
/// error; a bad row shouldn't take down a watermark read.
fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Converts an `Option<String>` timestamp to a [`DatabaseValue`].
fn opt_ts(ts: Option<DateTime<Utc>>) -> DatabaseValue {
    ts.map_or(DatabaseValue::Null, |t| DatabaseValue::String(fmt_ts(t)))
}

/// Converts an `Option<f64>` to a [`DatabaseValue`], using `Null` for
/// `None`.
fn opt_f64(value: Option<f64>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, DatabaseValue::Real64)
}

/// Tally of one `insert_if_absent` call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Rows newly persisted.
    pub inserted: u64,
    /// Rows whose `incident_id` was already present (harmless no-ops).
    pub skipped: u64,
    /// Rows rejected by the database (logged and dropped).
    pub failed: u64,
    /// Newly persisted rows broken down by source, for per-source
    /// status bookkeeping.
    pub per_source: BTreeMap<Source, u64>,
}

/// Inserts a batch of canonical incidents, skipping any whose
/// `incident_id` already exists.
///
/// `INSERT OR IGNORE` leaves the uniqueness decision to the UNIQUE
/// constraint, so the call is idempotent and safe for overlapping or
/// fully-duplicate batches. A single record's failure is logged and
/// counted; the rest of the batch continues.
///
/// # Errors
///
/// Returns [`DbError`] only if the store itself is unusable; per-record
/// constraint failures are absorbed into the outcome.
pub async fn insert_if_absent(
    db: &dyn Database,
    incidents: &[CanonicalIncident],
) -> Result<InsertOutcome, DbError> {
    let mut outcome = InsertOutcome::default();
    let now = fmt_ts(Utc::now());

    for incident in incidents {
        let result = db
            .exec_raw_params(
                "INSERT OR IGNORE INTO incidents
                    (incident_id, occurred_at, description, location,
                     crime_type, source, latitude, longitude, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                &[
                    DatabaseValue::String(incident.incident_id.clone()),
                    opt_ts(incident.occurred_at),
                    DatabaseValue::String(incident.description.clone()),
                    DatabaseValue::String(incident.location.clone()),
                    DatabaseValue::String(incident.crime_type.clone()),
                    DatabaseValue::String(incident.source.to_string()),
                    opt_f64(incident.latitude),
                    opt_f64(incident.longitude),
                    DatabaseValue::String(now.clone()),
                ],
            )
            .await;

        match result {
            Ok(affected) if affected > 0 => {
                outcome.inserted += 1;
                *outcome.per_source.entry(incident.source).or_insert(0) += 1;
            }
            Ok(_) => outcome.skipped += 1,
            Err(e) => {
                log::error!("Failed to insert incident {}: {e}", incident.incident_id);
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

/// Returns the maximum `occurred_at` among stored incidents for a
/// source, or `None` if the source has never been ingested.
///
/// This is the source's watermark. It is a pure read over durable rows
/// (dateless rows excluded by SQL `MAX` semantics), so it self-heals
/// after a partially-failed run: the next window reflects what actually
/// landed, not what was attempted.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn max_occurred_at(
    db: &dyn Database,
    source: Source,
) -> Result<Option<DateTime<Utc>>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT MAX(occurred_at) AS max_occurred_at FROM incidents WHERE source = ?",
            &[DatabaseValue::String(source.to_string())],
        )
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let raw: Option<String> = row.to_value("max_occurred_at").unwrap_or(None);

    Ok(raw.as_deref().and_then(parse_ts))
}

/// Replaces the current status row for a source.
///
/// Called exactly once per source per run, success or failure. The row
/// is a snapshot of the latest attempt, not a history.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub async fn upsert_status(
    db: &dyn Database,
    source: Source,
    status: FetchStatus,
    records_count: i64,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT OR REPLACE INTO sources (source, last_fetch, status, records_count)
         VALUES (?, ?, ?, ?)",
        &[
            DatabaseValue::String(source.to_string()),
            DatabaseValue::String(fmt_ts(Utc::now())),
            DatabaseValue::String(status.to_string()),
            DatabaseValue::Int64(records_count),
        ],
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(())
}

/// Retrieves the status snapshot for every source that has ever been
/// attempted, ordered by source tag.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_statuses(db: &dyn Database) -> Result<Vec<SourceStatus>, DbError> {
    let rows = db
        .query_raw_params("SELECT * FROM sources ORDER BY source ASC", &[])
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(rows.iter().filter_map(row_to_status).collect())
}

/// Converts a `sources` row into a [`SourceStatus`]. Rows with
/// unparseable tags (e.g. from a removed source) are dropped.
fn row_to_status(row: &switchy_database::Row) -> Option<SourceStatus> {
    let source = row
        .to_value::<String>("source")
        .unwrap_or_default()
        .parse::<Source>()
        .ok()?;

    let last_fetch = row
        .to_value::<String>("last_fetch")
        .ok()
        .as_deref()
        .and_then(parse_ts)?;

    let status = row
        .to_value::<String>("status")
        .unwrap_or_default()
        .parse()
        .unwrap_or(FetchStatus::Failure);

    Some(SourceStatus {
        source,
        last_fetch,
        status,
        records_count: row.to_value("records_count").unwrap_or(0),
    })
}

/// Retrieves stored incidents for a source, newest first, optionally
/// bounded by an `occurred_at` window.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn incidents_for_source(
    db: &dyn Database,
    source: Source,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: u32,
) -> Result<Vec<CanonicalIncident>, DbError> {
    let mut sql = String::from(
        "SELECT incident_id, occurred_at, description, location,
                crime_type, source, latitude, longitude
         FROM incidents WHERE source = ?",
    );
    let mut params = vec![DatabaseValue::String(source.to_string())];

    if let Some(from) = from {
        sql.push_str(" AND occurred_at >= ?");
        params.push(DatabaseValue::String(fmt_ts(from)));
    }
    if let Some(to) = to {
        sql.push_str(" AND occurred_at <= ?");
        params.push(DatabaseValue::String(fmt_ts(to)));
    }

    sql.push_str(" ORDER BY occurred_at DESC LIMIT ?");
    params.push(DatabaseValue::Int64(i64::from(limit)));

    let rows = db
        .query_raw_params(&sql, &params)
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(rows.iter().filter_map(row_to_incident).collect())
}

/// Converts an `incidents` row into a [`CanonicalIncident`].
fn row_to_incident(row: &switchy_database::Row) -> Option<CanonicalIncident> {
    let source = row
        .to_value::<String>("source")
        .unwrap_or_default()
        .parse::<Source>()
        .ok()?;

    Some(CanonicalIncident {
        incident_id: row.to_value("incident_id").unwrap_or_default(),
        occurred_at: row
            .to_value::<Option<String>>("occurred_at")
            .unwrap_or(None)
            .as_deref()
            .and_then(parse_ts),
        description: row.to_value("description").unwrap_or_default(),
        location: row.to_value("location").unwrap_or_default(),
        crime_type: row.to_value("crime_type").unwrap_or_default(),
        source,
        latitude: row.to_value("latitude").unwrap_or(None),
        longitude: row.to_value("longitude").unwrap_or(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn incident(id: &str, source: Source, occurred_at: Option<&str>) -> CanonicalIncident {
        CanonicalIncident {
            incident_id: id.to_string(),
            occurred_at: occurred_at.and_then(parse_ts),
            description: "desc".to_string(),
            location: "loc".to_string(),
            crime_type: "THEFT".to_string(),
            source,
            latitude: Some(41.9),
            longitude: Some(-87.6),
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let db = db::open(None).await.unwrap();
        let batch = vec![
            incident("police_chicago_1", Source::PoliceChicago, Some("2024-01-01T00:00:00Z")),
            incident("police_chicago_2", Source::PoliceChicago, Some("2024-01-02T00:00:00Z")),
        ];

        let first = insert_if_absent(db.as_ref(), &batch).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.skipped, 0);

        let second = insert_if_absent(db.as_ref(), &batch).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);

        let stored = incidents_for_source(db.as_ref(), Source::PoliceChicago, None, None, 100)
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn insert_tallies_per_source() {
        let db = db::open(None).await.unwrap();
        let batch = vec![
            incident("police_chicago_1", Source::PoliceChicago, None),
            incident("police_sf_1", Source::PoliceSf, None),
            incident("police_sf_2", Source::PoliceSf, None),
        ];

        let outcome = insert_if_absent(db.as_ref(), &batch).await.unwrap();
        assert_eq!(outcome.inserted, 3);
        assert_eq!(outcome.per_source[&Source::PoliceChicago], 1);
        assert_eq!(outcome.per_source[&Source::PoliceSf], 2);
    }

    #[tokio::test]
    async fn watermark_is_max_occurred_at() {
        let db = db::open(None).await.unwrap();
        assert!(max_occurred_at(db.as_ref(), Source::PoliceSf)
            .await
            .unwrap()
            .is_none());

        let batch = vec![
            incident("police_sf_1", Source::PoliceSf, Some("2024-01-01T00:00:00Z")),
            incident("police_sf_2", Source::PoliceSf, Some("2024-03-01T12:30:00Z")),
            incident("police_sf_3", Source::PoliceSf, None),
            incident("police_chicago_1", Source::PoliceChicago, Some("2024-06-01T00:00:00Z")),
        ];
        insert_if_absent(db.as_ref(), &batch).await.unwrap();

        let watermark = max_occurred_at(db.as_ref(), Source::PoliceSf)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fmt_ts(watermark), "2024-03-01T12:30:00Z");
    }

    #[tokio::test]
    async fn status_row_is_replaced_not_appended() {
        let db = db::open(None).await.unwrap();

        upsert_status(db.as_ref(), Source::Newsapi, FetchStatus::Success, 7)
            .await
            .unwrap();
        upsert_status(db.as_ref(), Source::Newsapi, FetchStatus::Failure, 0)
            .await
            .unwrap();

        let statuses = get_statuses(db.as_ref()).await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].source, Source::Newsapi);
        assert_eq!(statuses[0].status, FetchStatus::Failure);
        assert_eq!(statuses[0].records_count, 0);
    }

    #[tokio::test]
    async fn lookup_honors_date_window() {
        let db = db::open(None).await.unwrap();
        let batch = vec![
            incident("police_chicago_1", Source::PoliceChicago, Some("2024-01-01T00:00:00Z")),
            incident("police_chicago_2", Source::PoliceChicago, Some("2024-02-01T00:00:00Z")),
            incident("police_chicago_3", Source::PoliceChicago, Some("2024-03-01T00:00:00Z")),
        ];
        insert_if_absent(db.as_ref(), &batch).await.unwrap();

        let window = incidents_for_source(
            db.as_ref(),
            Source::PoliceChicago,
            parse_ts("2024-01-15T00:00:00Z"),
            parse_ts("2024-02-15T00:00:00Z"),
            100,
        )
        .await
        .unwrap();

        assert_eq!(window.len(), 1);
        assert_eq!(window[0].incident_id, "police_chicago_2");
    }

    #[tokio::test]
    async fn round_trips_optional_fields() {
        let db = db::open(None).await.unwrap();
        let mut original = incident("newsapi_x", Source::Newsapi, None);
        original.latitude = None;
        original.longitude = None;
        insert_if_absent(db.as_ref(), std::slice::from_ref(&original))
            .await
            .unwrap();

        let stored = incidents_for_source(db.as_ref(), Source::Newsapi, None, None, 10)
            .await
            .unwrap();
        assert_eq!(stored, vec![original]);
    }
}
