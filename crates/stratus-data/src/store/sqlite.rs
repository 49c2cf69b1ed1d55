//! SQLite store for forecasts, observations, errors and the model registry.
//!
//! Timestamps are stored as RFC 3339 UTC strings at second resolution
//! (`2024-05-01T06:00:00Z`), so lexical order is time order and the exact
//! `valid_time == obs_time` join is a string comparison.

use crate::error::{DataError, Result};
use crate::records::{
    ErrorRecord, ForecastRecord, Location, ModelMetricsRecord, ModelRecord, ObservationRecord,
};
use crate::source::RecordSource;
use crate::variable::{ForecastSource, Variable};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::path::Path;
use tracing::debug;

/// SQLite-backed record store.
///
/// Opened once per process and passed by reference to every job; the
/// connection closes when the store is dropped.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

/// Format a timestamp for storage.
pub fn to_db_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_db_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_tag<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = DataError>,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl SqliteStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS forecasts (
                source TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                variable TEXT NOT NULL,
                issue_time TEXT NOT NULL,
                valid_time TEXT NOT NULL,
                horizon_hours INTEGER NOT NULL CHECK (horizon_hours >= 0),
                value REAL NOT NULL,
                unit TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_forecasts_variable_valid
                ON forecasts(variable, valid_time);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_forecasts_our_model
                ON forecasts(lat, lon, variable, issue_time, valid_time)
                WHERE source = 'our_model';

            CREATE TABLE IF NOT EXISTS observations (
                station_id TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                variable TEXT NOT NULL,
                obs_time TEXT NOT NULL,
                value REAL NOT NULL,
                unit TEXT NOT NULL,
                source TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_observations_variable_time
                ON observations(variable, obs_time);

            CREATE TABLE IF NOT EXISTS errors (
                source TEXT NOT NULL,
                variable TEXT NOT NULL,
                valid_time TEXT NOT NULL,
                horizon_hours INTEGER NOT NULL,
                mae REAL NOT NULL,
                rmse REAL NOT NULL,
                mape REAL NOT NULL,
                n INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_errors_valid ON errors(valid_time);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_errors_group
                ON errors(source, variable, valid_time, horizon_hours);

            CREATE TABLE IF NOT EXISTS models (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                run_identifier TEXT NOT NULL,
                is_champion INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_models_single_champion
                ON models(name) WHERE is_champion = 1;

            CREATE TABLE IF NOT EXISTS model_metrics (
                run_identifier TEXT NOT NULL,
                name TEXT NOT NULL,
                variable TEXT NOT NULL,
                horizon_hours INTEGER NOT NULL,
                recorded_at TEXT NOT NULL,
                rmse REAL NOT NULL,
                mae REAL NOT NULL,
                n INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_model_metrics_run
                ON model_metrics(run_identifier, recorded_at);",
        )?;
        Ok(())
    }

    /// Append forecast records.
    ///
    /// An `our_model` record whose location, variable, issue and valid time
    /// are already stored is skipped. Returns the number of rows inserted.
    pub fn insert_forecasts(&self, records: &[ForecastRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut inserted = 0;
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO forecasts
                 (source, lat, lon, variable, issue_time, valid_time, horizon_hours, value, unit)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(lat, lon, variable, issue_time, valid_time)
                     WHERE source = 'our_model' DO NOTHING",
            )?;
            for r in records {
                inserted += stmt.execute(params![
                    r.source().as_str(),
                    r.location().lat,
                    r.location().lon,
                    r.variable().as_str(),
                    to_db_time(r.issue_time()),
                    to_db_time(r.valid_time()),
                    r.horizon_hours(),
                    r.value(),
                    r.unit().as_str(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = inserted, "inserted forecasts");
        Ok(inserted)
    }

    /// Append observation records.
    pub fn insert_observations(&self, records: &[ObservationRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO observations
                 (station_id, lat, lon, variable, obs_time, value, unit, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for r in records {
                stmt.execute(params![
                    r.station_id,
                    r.location.lat,
                    r.location.lon,
                    r.variable.as_str(),
                    to_db_time(r.obs_time),
                    r.value,
                    r.unit.as_str(),
                    r.source,
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = records.len(), "inserted observations");
        Ok(records.len())
    }

    /// Get all forecasts for a variable, ordered by valid time.
    pub fn get_forecasts(&self, variable: Variable) -> Result<Vec<ForecastRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, lat, lon, issue_time, valid_time, value
             FROM forecasts
             WHERE variable = ?1
             ORDER BY valid_time ASC",
        )?;

        let rows = stmt.query_map(params![variable.as_str()], |row| {
            Ok((
                parse_tag::<ForecastSource>(0, &row.get::<_, String>(0)?)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                parse_db_time(3, &row.get::<_, String>(3)?)?,
                parse_db_time(4, &row.get::<_, String>(4)?)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (source, lat, lon, issue, valid, value) = row?;
            records.push(ForecastRecord::new(
                source,
                Location::new(lat, lon),
                variable,
                issue,
                valid,
                value,
            )?);
        }
        Ok(records)
    }

    /// Get all observations for a variable, ordered by observation time.
    pub fn get_observations(&self, variable: Variable) -> Result<Vec<ObservationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT station_id, lat, lon, obs_time, value, unit, source
             FROM observations
             WHERE variable = ?1
             ORDER BY obs_time ASC",
        )?;

        let rows = stmt.query_map(params![variable.as_str()], |row| {
            Ok(ObservationRecord {
                station_id: row.get(0)?,
                location: Location::new(row.get(1)?, row.get(2)?),
                variable,
                obs_time: parse_db_time(3, &row.get::<_, String>(3)?)?,
                value: row.get(4)?,
                unit: parse_tag(5, &row.get::<_, String>(5)?)?,
                source: row.get(6)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DataError::from)
    }

    /// Write error records keyed by `(source, variable, valid_time, horizon_hours)`.
    ///
    /// New groups are inserted and existing groups whose metrics changed are
    /// replaced. Returns the number of rows written.
    pub fn upsert_errors(&self, records: &[ErrorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut written = 0;
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO errors
                 (source, variable, valid_time, horizon_hours, mae, rmse, mape, n)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(source, variable, valid_time, horizon_hours) DO UPDATE SET
                     mae = excluded.mae,
                     rmse = excluded.rmse,
                     mape = excluded.mape,
                     n = excluded.n
                 WHERE errors.n <> excluded.n
                    OR errors.mae <> excluded.mae
                    OR errors.rmse <> excluded.rmse
                    OR errors.mape <> excluded.mape",
            )?;
            for r in records {
                written += stmt.execute(params![
                    r.source.as_str(),
                    r.variable.as_str(),
                    to_db_time(r.valid_time),
                    r.horizon_hours,
                    r.mae,
                    r.rmse,
                    r.mape,
                    r.n as i64,
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = written, "wrote errors");
        Ok(written)
    }

    /// Get error records with `valid_time >= since`.
    pub fn get_errors_since(&self, since: DateTime<Utc>) -> Result<Vec<ErrorRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, variable, valid_time, horizon_hours, mae, rmse, mape, n
             FROM errors
             WHERE valid_time >= ?1
             ORDER BY valid_time ASC, source ASC",
        )?;

        let rows = stmt.query_map(params![to_db_time(since)], |row| {
            Ok(ErrorRecord {
                source: parse_tag(0, &row.get::<_, String>(0)?)?,
                variable: parse_tag(1, &row.get::<_, String>(1)?)?,
                valid_time: parse_db_time(2, &row.get::<_, String>(2)?)?,
                horizon_hours: row.get(3)?,
                mae: row.get(4)?,
                rmse: row.get(5)?,
                mape: row.get(6)?,
                n: row.get::<_, i64>(7)? as usize,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DataError::from)
    }

    /// Record pooled evaluation metrics for a run.
    pub fn put_model_metrics(&self, record: &ModelMetricsRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO model_metrics
             (run_identifier, name, variable, horizon_hours, recorded_at, rmse, mae, n)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.run_identifier,
                record.name,
                record.variable.as_str(),
                record.horizon_hours,
                to_db_time(record.recorded_at),
                record.rmse,
                record.mae,
                record.n as i64,
            ],
        )?;
        Ok(())
    }

    /// Metrics recorded for a run with `recorded_at >= since`.
    pub fn get_model_metrics_since(
        &self,
        run_identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ModelMetricsRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_identifier, name, variable, horizon_hours, recorded_at, rmse, mae, n
             FROM model_metrics
             WHERE run_identifier = ?1 AND recorded_at >= ?2
             ORDER BY recorded_at ASC",
        )?;

        let rows = stmt.query_map(params![run_identifier, to_db_time(since)], |row| {
            Ok(ModelMetricsRecord {
                run_identifier: row.get(0)?,
                name: row.get(1)?,
                variable: parse_tag(2, &row.get::<_, String>(2)?)?,
                horizon_hours: row.get(3)?,
                recorded_at: parse_db_time(4, &row.get::<_, String>(4)?)?,
                rmse: row.get(5)?,
                mae: row.get(6)?,
                n: row.get::<_, i64>(7)? as usize,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DataError::from)
    }

    fn map_model(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModelRecord> {
        Ok(ModelRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            run_identifier: row.get(2)?,
            is_champion: row.get::<_, i64>(3)? != 0,
            created_at: parse_db_time(4, &row.get::<_, String>(4)?)?,
        })
    }

    /// All registry rows for a model name, oldest first.
    pub fn get_models(&self, name: &str) -> Result<Vec<ModelRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, run_identifier, is_champion, created_at
             FROM models
             WHERE name = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![name], Self::map_model)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DataError::from)
    }

    /// Current champion for a model name.
    pub fn get_champion(&self, name: &str) -> Result<Option<ModelRecord>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, name, run_identifier, is_champion, created_at
                 FROM models
                 WHERE name = ?1 AND is_champion = 1",
                params![name],
                Self::map_model,
            )
            .optional()?;
        Ok(result)
    }

    /// Current champions of every model name.
    pub fn get_champions(&self) -> Result<Vec<ModelRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, run_identifier, is_champion, created_at
             FROM models
             WHERE is_champion = 1
             ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], Self::map_model)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DataError::from)
    }

    /// Atomically replace the champion of `name`.
    ///
    /// Inside one immediate transaction the current champion id is compared
    /// with `expected_champion` (`None` meaning "no champion yet"); on a
    /// match every champion row for the name is demoted and a new champion
    /// row for `run_identifier` is inserted. On a mismatch nothing is written
    /// and `None` is returned, so a caller that compared against a stale
    /// champion never overwrites a concurrent promotion.
    pub fn swap_champion(
        &self,
        name: &str,
        expected_champion: Option<i64>,
        run_identifier: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<ModelRecord>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let current: Option<i64> = tx
            .query_row(
                "SELECT id FROM models WHERE name = ?1 AND is_champion = 1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if current != expected_champion {
            debug!(name, ?current, ?expected_champion, "champion changed, swap aborted");
            return Ok(None);
        }

        tx.execute(
            "UPDATE models SET is_champion = 0 WHERE name = ?1 AND is_champion = 1",
            params![name],
        )?;
        tx.execute(
            "INSERT INTO models (name, run_identifier, is_champion, created_at)
             VALUES (?1, ?2, 1, ?3)",
            params![name, run_identifier, to_db_time(at)],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Some(ModelRecord {
            id,
            name: name.to_string(),
            run_identifier: run_identifier.to_string(),
            is_champion: true,
            created_at: at,
        }))
    }

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            forecasts: count("SELECT COUNT(*) FROM forecasts")?,
            observations: count("SELECT COUNT(*) FROM observations")?,
            errors: count("SELECT COUNT(*) FROM errors")?,
            models: count("SELECT COUNT(*) FROM models")?,
            champions: count("SELECT COUNT(*) FROM models WHERE is_champion = 1")?,
        })
    }
}

impl RecordSource for SqliteStore {
    fn forecasts(&self, variable: Variable) -> Result<Vec<ForecastRecord>> {
        self.get_forecasts(variable)
    }

    fn observations(&self, variable: Variable) -> Result<Vec<ObservationRecord>> {
        self.get_observations(variable)
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of forecast rows
    pub forecasts: usize,
    /// Number of observation rows
    pub observations: usize,
    /// Number of error rows
    pub errors: usize,
    /// Number of registry rows
    pub models: usize,
    /// Number of champion rows
    pub champions: usize,
}
