use crate::StoreError;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Iso8601;
use time::OffsetDateTime;
use tracing::debug;

const TABLE_NAME: &str = "samples";

/// One historian row: the snapshot of every reading and setpoint at a point
/// in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: f64,
    pub temperature_avg: Option<f64>,
    pub temperature_ch1: Option<f64>,
    pub temperature_ch2: Option<f64>,
    pub humidity: Option<f64>,
    pub o2: Option<f64>,
    pub co2: Option<f64>,
    pub temp_setpoint: f64,
    pub humidity_setpoint: f64,
    pub o2_setpoint: f64,
    pub co2_setpoint: f64,
}

/// Default query-timeout budget for a range query, growing with the span
/// being queried: short ranges are bounded in seconds, "all history" is
/// bounded by a minute.
pub fn default_query_timeout(start: f64, end: f64) -> Duration {
    let span = (end - start).abs();
    if !span.is_finite() || span > 7 * 24 * 3600.0 {
        Duration::from_secs(60)
    } else if span > 24 * 3600.0 {
        Duration::from_secs(20)
    } else if span > 3600.0 {
        Duration::from_secs(5)
    } else {
        Duration::from_secs(2)
    }
}

/// Append-mostly sample store: schema-creation-on-open, append, range
/// query, CSV export, backed by `rusqlite`. Blocking SQLite work is
/// dispatched to the blocking pool via `spawn_blocking` so it never stalls
/// the loop scheduler, and every write serializes through one mutex.
#[derive(Clone)]
pub struct Historian {
    conn: Arc<Mutex<Connection>>,
}

impl Historian {
    /// Opens (creating if absent) the database file and ensures the samples
    /// table exists.
    pub async fn open(path: impl AsRef<Path> + Send + 'static) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn = Connection::open(path)?;
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                        timestamp REAL PRIMARY KEY,
                        temperature_avg REAL,
                        temperature_ch1 REAL,
                        temperature_ch2 REAL,
                        humidity REAL,
                        o2 REAL,
                        co2 REAL,
                        temp_setpoint REAL NOT NULL,
                        humidity_setpoint REAL NOT NULL,
                        o2_setpoint REAL NOT NULL,
                        co2_setpoint REAL NOT NULL
                    )"
                ),
                [],
            )?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database. Useful for tests and the `sim`
    /// subcommand, where nothing needs to survive the process.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection, StoreError> {
            let conn = Connection::open_in_memory()?;
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                        timestamp REAL PRIMARY KEY,
                        temperature_avg REAL,
                        temperature_ch1 REAL,
                        temperature_ch2 REAL,
                        humidity REAL,
                        o2 REAL,
                        co2 REAL,
                        temp_setpoint REAL NOT NULL,
                        humidity_setpoint REAL NOT NULL,
                        o2_setpoint REAL NOT NULL,
                        co2_setpoint REAL NOT NULL
                    )"
                ),
                [],
            )?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Appends one row. Inserts are append-only and keyed by timestamp; a
    /// caller that reuses a timestamp gets a `StoreError::Database` from the
    /// primary-key conflict rather than a silent overwrite.
    pub async fn append(&self, sample: Sample) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.lock();
            conn.execute(
                &format!(
                    "INSERT INTO {TABLE_NAME} (
                        timestamp, temperature_avg, temperature_ch1, temperature_ch2,
                        humidity, o2, co2,
                        temp_setpoint, humidity_setpoint, o2_setpoint, co2_setpoint
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    sample.timestamp,
                    sample.temperature_avg,
                    sample.temperature_ch1,
                    sample.temperature_ch2,
                    sample.humidity,
                    sample.o2,
                    sample.co2,
                    sample.temp_setpoint,
                    sample.humidity_setpoint,
                    sample.o2_setpoint,
                    sample.co2_setpoint,
                ],
            )?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    /// Returns every sample with `start <= timestamp <= end`, in
    /// non-decreasing timestamp order, cancelable with `timeout`.
    pub async fn range(
        &self,
        start: f64,
        end: f64,
        timeout: Duration,
    ) -> Result<Vec<Sample>, StoreError> {
        let conn = self.conn.clone();
        let query = tokio::task::spawn_blocking(move || -> Result<Vec<Sample>, StoreError> {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT timestamp, temperature_avg, temperature_ch1, temperature_ch2,
                        humidity, o2, co2,
                        temp_setpoint, humidity_setpoint, o2_setpoint, co2_setpoint
                 FROM {TABLE_NAME}
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY timestamp ASC"
            ))?;
            let rows = stmt.query_map(params![start, end], |row| {
                Ok(Sample {
                    timestamp: row.get(0)?,
                    temperature_avg: row.get(1)?,
                    temperature_ch1: row.get(2)?,
                    temperature_ch2: row.get(3)?,
                    humidity: row.get(4)?,
                    o2: row.get(5)?,
                    co2: row.get(6)?,
                    temp_setpoint: row.get(7)?,
                    humidity_setpoint: row.get(8)?,
                    o2_setpoint: row.get(9)?,
                    co2_setpoint: row.get(10)?,
                })
            })?;
            let mut samples = Vec::new();
            for row in rows {
                samples.push(row?);
            }
            Ok(samples)
        });

        match tokio::time::timeout(timeout, query).await {
            Ok(join_result) => join_result?,
            Err(_) => Err(StoreError::QueryTimeout),
        }
    }

    /// Renders the same range as `range` to CSV text: a header row plus one
    /// row per sample, with the timestamp column formatted as ISO-8601 UTC
    /// and every other column numeric or empty for a missing reading.
    pub async fn export_csv(
        &self,
        start: f64,
        end: f64,
        timeout: Duration,
    ) -> Result<String, StoreError> {
        let samples = self.range(start, end, timeout).await?;
        debug!(count = samples.len(), "exporting historian range to CSV");

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record([
            "timestamp",
            "temperature_avg",
            "temperature_ch1",
            "temperature_ch2",
            "humidity",
            "o2",
            "co2",
            "temp_setpoint",
            "humidity_setpoint",
            "o2_setpoint",
            "co2_setpoint",
        ])?;

        for sample in &samples {
            let ts = OffsetDateTime::from_unix_timestamp_nanos(
                (sample.timestamp * 1_000_000_000.0) as i128,
            )
            .map(|dt| dt.format(&Iso8601::DEFAULT).unwrap_or_default())
            .unwrap_or_default();

            writer.write_record([
                ts,
                opt_to_string(sample.temperature_avg),
                opt_to_string(sample.temperature_ch1),
                opt_to_string(sample.temperature_ch2),
                opt_to_string(sample.humidity),
                opt_to_string(sample.o2),
                opt_to_string(sample.co2),
                sample.temp_setpoint.to_string(),
                sample.humidity_setpoint.to_string(),
                sample.o2_setpoint.to_string(),
                sample.co2_setpoint.to_string(),
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes).expect("csv writer only ever emits valid utf8 here"))
    }
}

fn opt_to_string(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
