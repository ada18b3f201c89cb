//! Consolidates per-source normalized batches into one ordered batch.
//!
//! Order across sources is insignificant; order within a source is
//! preserved. Deduplication is delegated entirely to the store's insert
//! semantics — the merger only drops records that fail mandatory-field
//! validation, counting and logging them rather than raising.

use crime_feed_models::CanonicalIncident;

/// Result of merging one run's batches.
#[derive(Debug, Default)]
pub struct MergedBatch {
    /// All valid incidents from every source, in per-source order.
    pub incidents: Vec<CanonicalIncident>,
    /// Records dropped for failing mandatory-field validation.
    pub dropped: u64,
}

/// Concatenates all adapters' normalized output for one pipeline run.
#[must_use]
pub fn merge(batches: Vec<Vec<CanonicalIncident>>) -> MergedBatch {
    let mut merged = MergedBatch::default();

    for batch in batches {
        for incident in batch {
            if incident.incident_id.is_empty() {
                log::warn!(
                    "Dropping {} record with empty incident_id",
                    incident.source
                );
                merged.dropped += 1;
                continue;
            }
            merged.incidents.push(incident);
        }
    }

    if merged.dropped > 0 {
        log::warn!("Merge dropped {} invalid record(s)", merged.dropped);
    }

    merged
}
