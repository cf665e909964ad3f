//! SQLite storage layer: classification runs, verdicts, and outliers.

pub mod schema;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::config::DetectorConfig;
use crate::model::{ClassificationResult, ClusterLabel, OutlierRecord};
use crate::sink::{OutlierSink, SinkError};

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager).with_context(|| format!("failed to open database {}", path))?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Register a new classification run and return its id.
pub fn begin_run(pool: &Pool, source: &str, detector: &DetectorConfig) -> Result<Uuid> {
    let conn = pool.get()?;
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO runs (id, source, config_json, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            id.to_string(),
            source,
            serde_json::to_string(detector)?,
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(id)
}

/// Store every verdict of a run in one transaction.
pub fn save_classifications(
    pool: &Pool,
    run_id: Uuid,
    results: &BTreeMap<String, ClassificationResult>,
) -> Result<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO classifications
                (run_id, vessel_id, has_problem, has_location_spoofing, has_identity_spoofing, cluster_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (vessel_id, r) in results {
            stmt.execute(params![
                run_id.to_string(),
                vessel_id,
                r.has_problem,
                r.has_location_spoofing,
                r.has_identity_spoofing,
                r.cluster_count
            ])?;
        }
    }
    tx.commit().context("failed to commit classifications")?;
    Ok(())
}

/// Verdicts of one run, keyed by vessel identifier.
pub fn list_classifications(pool: &Pool, run_id: Uuid) -> Result<BTreeMap<String, ClassificationResult>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT vessel_id, has_problem, has_location_spoofing, has_identity_spoofing, cluster_count
         FROM classifications WHERE run_id = ?1",
    )?;
    let rows = stmt.query_map(params![run_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            ClassificationResult {
                has_problem: row.get(1)?,
                has_location_spoofing: row.get(2)?,
                has_identity_spoofing: row.get(3)?,
                cluster_count: row.get(4)?,
            },
        ))
    })?;

    let mut results = BTreeMap::new();
    for r in rows {
        let (id, result) = r?;
        results.insert(id, result);
    }
    Ok(results)
}

/// Most recently started run, if any.
pub fn latest_run(pool: &Pool) -> Result<Option<Uuid>> {
    let conn = pool.get()?;
    let id: Option<String> = conn
        .query_row("SELECT id FROM runs ORDER BY rowid DESC LIMIT 1", [], |row| row.get(0))
        .optional()?;
    id.map(|id| Uuid::parse_str(&id).with_context(|| format!("bad run id in runs table: {}", id)))
        .transpose()
}

pub fn save_outliers(pool: &Pool, run_id: Uuid, points: &[OutlierRecord]) -> Result<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO outliers (run_id, vessel_id, observed_at, lon, lat, sog, cluster_label)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for p in points {
            stmt.execute(params![
                run_id.to_string(),
                p.vessel_id,
                p.timestamp.to_rfc3339(),
                p.lon,
                p.lat,
                p.sog,
                p.cluster_label.0
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Outliers a run stored for one vessel, oldest first.
pub fn outliers_for(pool: &Pool, run_id: Uuid, vessel_id: &str) -> Result<Vec<OutlierRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT vessel_id, observed_at, lon, lat, sog, cluster_label
         FROM outliers WHERE run_id = ?1 AND vessel_id = ?2 ORDER BY observed_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![run_id.to_string(), vessel_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, i32>(5)?,
        ))
    })?;

    let mut out = Vec::new();
    for r in rows {
        let (vessel_id, observed_at, lon, lat, sog, label) = r?;
        let timestamp = DateTime::parse_from_rfc3339(&observed_at)
            .with_context(|| format!("bad timestamp in outliers table: {}", observed_at))?
            .with_timezone(&Utc);
        out.push(OutlierRecord {
            vessel_id,
            timestamp,
            lon,
            lat,
            sog,
            cluster_label: ClusterLabel(label),
        });
    }
    Ok(out)
}

/// Outlier sink backed by the `outliers` table, writing under one run.
pub struct SqliteOutlierSink {
    pool: Pool,
    run_id: Uuid,
}

impl SqliteOutlierSink {
    /// `run_id` must come from [`begin_run`] on the same database.
    pub fn new(pool: Pool, run_id: Uuid) -> Self {
        Self { pool, run_id }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl OutlierSink for SqliteOutlierSink {
    fn record(
        &self,
        _vessel_id: &str,
        _cluster_label: ClusterLabel,
        points: &[OutlierRecord],
    ) -> Result<(), SinkError> {
        save_outliers(&self.pool, self.run_id, points).map_err(|e| SinkError::Storage(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_pool() -> (tempfile::TempDir, Pool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spoofwatch.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    #[test]
    fn test_classifications_round_trip() -> Result<()> {
        let (_dir, pool) = temp_pool();
        let run_id = begin_run(&pool, "a.csv", &DetectorConfig::default())?;

        let mut results = BTreeMap::new();
        results.insert("237000001".to_string(), ClassificationResult::NOT_APPLICABLE);
        results.insert(
            "237000002".to_string(),
            ClassificationResult {
                has_problem: true,
                has_location_spoofing: false,
                has_identity_spoofing: true,
                cluster_count: 3,
            },
        );
        save_classifications(&pool, run_id, &results)?;

        assert_eq!(list_classifications(&pool, run_id)?, results);
        assert!(list_classifications(&pool, Uuid::new_v4())?.is_empty());
        Ok(())
    }

    fn point() -> OutlierRecord {
        OutlierRecord {
            vessel_id: "237000001".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            lon: 23.5,
            lat: 37.9,
            sog: 11.0,
            cluster_label: ClusterLabel(2),
        }
    }

    #[test]
    fn test_sqlite_sink_is_queryable_by_vessel() -> Result<()> {
        let (_dir, pool) = temp_pool();
        let run_id = begin_run(&pool, "a.csv", &DetectorConfig::default())?;
        let sink = SqliteOutlierSink::new(pool.clone(), run_id);
        sink.record("237000001", ClusterLabel(2), &[point()])?;

        assert_eq!(outliers_for(&pool, run_id, "237000001")?, vec![point()]);
        assert!(outliers_for(&pool, run_id, "237000002")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_outliers_are_kept_per_run() -> Result<()> {
        let (_dir, pool) = temp_pool();
        assert_eq!(latest_run(&pool)?, None);

        let first = begin_run(&pool, "a.csv", &DetectorConfig::default())?;
        SqliteOutlierSink::new(pool.clone(), first).record("237000001", ClusterLabel(2), &[point()])?;
        let second = begin_run(&pool, "a.csv", &DetectorConfig::default())?;
        SqliteOutlierSink::new(pool.clone(), second).record("237000001", ClusterLabel(2), &[point()])?;

        assert_eq!(latest_run(&pool)?, Some(second));
        assert_eq!(outliers_for(&pool, first, "237000001")?.len(), 1);
        assert_eq!(outliers_for(&pool, second, "237000001")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_sink_requires_registered_run() {
        let (_dir, pool) = temp_pool();
        let sink = SqliteOutlierSink::new(pool, Uuid::new_v4());
        assert!(sink.record("237000001", ClusterLabel(2), &[point()]).is_err());
    }
}
