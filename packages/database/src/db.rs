//! Store lifecycle: opening the `SQLite` database and ensuring the
//! schema exists.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

use crate::DbError;

/// Opens (or creates) the ingestion store at the given path and ensures
/// all tables exist. `None` opens an in-memory database (used by tests).
///
/// # Errors
///
/// Returns [`DbError`] if the database file cannot be created or the
/// schema DDL fails.
pub async fn open(path: Option<&Path>) -> Result<Box<dyn Database>, DbError> {
    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = init_sqlite_rusqlite(path).map_err(|e| DbError::Database(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Opens the store at the path named by the `CRIME_FEED_DB` environment
/// variable, defaulting to `crime_feed.db` in the working directory.
///
/// # Errors
///
/// Returns [`DbError`] if opening or schema creation fails.
pub async fn open_from_env() -> Result<Box<dyn Database>, DbError> {
    let path = std::env::var("CRIME_FEED_DB").unwrap_or_else(|_| "crime_feed.db".to_string());
    open(Some(Path::new(&path))).await
}

/// Creates all tables and indexes if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS incidents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            incident_id TEXT NOT NULL UNIQUE,
            occurred_at TEXT,
            description TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            crime_type TEXT NOT NULL DEFAULT '',
            source TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            created_at TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS sources (
            source TEXT PRIMARY KEY,
            last_fetch TEXT NOT NULL,
            status TEXT NOT NULL,
            records_count INTEGER NOT NULL DEFAULT 0
        )",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_incidents_occurred_at ON incidents(occurred_at)")
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_incidents_source ON incidents(source)")
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(())
}
