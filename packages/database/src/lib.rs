#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` ingestion store for canonical incidents.
//!
//! Two tables: `incidents`, keyed by a UNIQUE `incident_id`, and
//! `sources`, one current-state row per source. Uniqueness is enforced
//! by the database itself (`INSERT OR IGNORE` against the UNIQUE
//! constraint), not checked-then-inserted, so overlapping or concurrent
//! batches resolve to exactly one durable row per identity.

pub mod db;
pub mod queries;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed (e.g., creating the database file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
