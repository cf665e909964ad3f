//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS runs (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            config_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS classifications (
            id INTEGER PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES runs(id),
            vessel_id TEXT NOT NULL,
            has_problem INTEGER NOT NULL,
            has_location_spoofing INTEGER NOT NULL,
            has_identity_spoofing INTEGER NOT NULL,
            cluster_count INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (run_id, vessel_id)
        );

        CREATE TABLE IF NOT EXISTS outliers (
            id INTEGER PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES runs(id),
            vessel_id TEXT NOT NULL,
            observed_at TEXT NOT NULL,
            lon REAL NOT NULL,
            lat REAL NOT NULL,
            sog REAL NOT NULL,
            cluster_label INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_outliers_run_vessel ON outliers(run_id, vessel_id);
        CREATE INDEX IF NOT EXISTS idx_classifications_vessel ON classifications(vessel_id);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
    )?;
    Ok(())
}
