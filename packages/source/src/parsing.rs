//! Shared parsing utilities for crime feed sources.
//!
//! Common date and coordinate parsing functions used across the source
//! implementations.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses a feed datetime string.
///
/// Accepts RFC 3339 (NewsAPI's `publishedAt`) and the Socrata-style
/// naive ISO 8601 forms the police feeds use, with or without fractional
/// seconds. Naive timestamps are taken as UTC.
#[must_use]
pub fn parse_feed_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Parses lat/lng from optional string fields. Returns `None` if missing,
/// unparseable, or zero.
#[must_use]
pub fn parse_lat_lng_str(lat: Option<&String>, lng: Option<&String>) -> Option<(f64, f64)> {
    let lat_str = lat?.as_str();
    let lng_str = lng?.as_str();
    let latitude = lat_str.parse::<f64>().ok()?;
    let longitude = lng_str.parse::<f64>().ok()?;
    if latitude == 0.0 || longitude == 0.0 {
        return None;
    }
    Some((latitude, longitude))
}
