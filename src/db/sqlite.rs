// SPDX-License-Identifier: MIT

//! SQLite-backed local store.
//!
//! All SQL runs on one dedicated worker thread owning the connection; async
//! callers send closures over a channel and await the reply on a oneshot.
//! This keeps the store usable from any task without holding a connection
//! lock across await points.

use std::convert::TryFrom;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

use crate::error::{CoreError, Result};
use crate::models::{ActivityRecord, SessionSummary, TrackPoint};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct StoreInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if self.sender.send(DbCommand::Shutdown).is_err() {
                tracing::error!("Store worker channel closed before shutdown");
            }
            if handle.join().is_err() {
                tracing::error!("Failed to join store worker thread");
            }
        }
    }
}

/// One cached row in a list partition.
#[derive(Debug, Clone)]
pub struct CachedRow {
    pub id: i64,
    pub payload: String,
    /// "remote" or "local", depending on which side last wrote the row.
    pub origin: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Handle to the local store. Cheap to clone; all clones share the worker.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

impl LocalStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))
                    .map_err(CoreError::Internal)?;
            }
        }
        Self::spawn_worker(Some(db_path.to_path_buf()))
    }

    /// Open an in-memory store (tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::spawn_worker(None)
    }

    fn spawn_worker(db_path: Option<PathBuf>) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("veloride-store".into())
            .spawn(move || {
                let opened = match &db_path {
                    Some(path) => Connection::open(path),
                    None => Connection::open_in_memory(),
                };
                let mut conn = match opened {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(CoreError::Database(err.to_string())));
                        return;
                    }
                };

                if db_path.is_some() {
                    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                        tracing::warn!(error = %err, "Failed to enable WAL mode");
                    }
                }

                let init = init_schema(&mut conn).map_err(CoreError::from);
                if ready_tx.send(init).is_err() {
                    tracing::error!("Store opener dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }
            })
            .map_err(|err| CoreError::Database(format!("failed to spawn store worker: {err}")))?;

        ready_rx
            .recv()
            .map_err(|_| CoreError::Database("store worker exited during init".into()))??;

        Ok(Self {
            inner: Arc::new(StoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Run a closure on the store's connection.
    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                tracing::error!("Store caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|_| CoreError::Database("store worker is gone".into()))?;

        reply_rx
            .await
            .map_err(|_| CoreError::Database("store worker terminated unexpectedly".into()))?
    }

    // ---- activity records ----

    /// Insert a finalized session as an immutable record, assigning its id.
    pub async fn insert_record(
        &self,
        summary: SessionSummary,
        thumbnail_path: Option<String>,
    ) -> Result<ActivityRecord> {
        self.execute(move |conn| {
            let route_json = serde_json::to_string(&summary.route)
                .map_err(|e| CoreError::Database(e.to_string()))?;
            conn.execute(
                "INSERT INTO activity_records
                     (start_time, end_time, duration_ms, distance_m,
                      avg_speed_kmh, max_speed_kmh, calories, route_json, thumbnail_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    summary.start_time.to_rfc3339(),
                    summary.end_time.to_rfc3339(),
                    to_i64(summary.duration_ms)?,
                    summary.distance_m,
                    summary.avg_speed_kmh,
                    summary.max_speed_kmh,
                    i64::from(summary.calories),
                    route_json,
                    thumbnail_path,
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(ActivityRecord {
                id,
                start_time: summary.start_time,
                end_time: summary.end_time,
                duration_ms: summary.duration_ms,
                distance_m: summary.distance_m,
                avg_speed_kmh: summary.avg_speed_kmh,
                max_speed_kmh: summary.max_speed_kmh,
                calories: summary.calories,
                route: summary.route,
                thumbnail_path,
            })
        })
        .await
    }

    /// All records, newest start time first.
    pub async fn list_records(&self) -> Result<Vec<ActivityRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, start_time, end_time, duration_ms, distance_m,
                        avg_speed_kmh, max_speed_kmh, calories, route_json, thumbnail_path
                 FROM activity_records
                 ORDER BY start_time DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(ActivityRecord::try_from(raw_record_from_row(row)?)?);
            }
            Ok(records)
        })
        .await
    }

    /// Look up one record by id.
    pub async fn get_record(&self, id: i64) -> Result<Option<ActivityRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, start_time, end_time, duration_ms, distance_m,
                        avg_speed_kmh, max_speed_kmh, calories, route_json, thumbnail_path
                 FROM activity_records
                 WHERE id = ?1",
            )?;
            let raw = stmt
                .query_row(params![id], raw_record_from_row)
                .optional()?;
            raw.map(ActivityRecord::try_from).transpose()
        })
        .await
    }

    /// Delete a record, returning the row that was removed (if any) so the
    /// caller can clean up the thumbnail artifact.
    pub async fn delete_record(&self, id: i64) -> Result<Option<ActivityRecord>> {
        let existing = self.get_record(id).await?;
        if existing.is_some() {
            self.execute(move |conn| {
                conn.execute("DELETE FROM activity_records WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        }
        Ok(existing)
    }

    // ---- cached list partitions ----

    /// Upsert one item into a partition.
    pub async fn upsert_cached(
        &self,
        kind: &'static str,
        id: i64,
        payload: String,
        origin: &'static str,
        last_synced_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO cached_items (kind, id, payload, origin, last_synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(kind, id) DO UPDATE SET
                     payload = excluded.payload,
                     origin = excluded.origin,
                     last_synced_at = excluded.last_synced_at",
                params![
                    kind,
                    id,
                    payload,
                    origin,
                    last_synced_at.map(|dt| dt.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Read a whole partition, ordered by id ascending.
    pub async fn read_cached(&self, kind: &'static str) -> Result<Vec<CachedRow>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, payload, origin, last_synced_at
                 FROM cached_items
                 WHERE kind = ?1
                 ORDER BY id ASC",
            )?;
            let mut rows = stmt.query(params![kind])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                let last_synced: Option<String> = row.get(3)?;
                items.push(CachedRow {
                    id: row.get(0)?,
                    payload: row.get(1)?,
                    origin: row.get(2)?,
                    last_synced_at: last_synced.as_deref().map(parse_datetime).transpose()?,
                });
            }
            Ok(items)
        })
        .await
    }

    /// Insert a never-synced item, assigning its local id. Local ids are
    /// negative so they cannot collide with server-assigned ids.
    ///
    /// Allocation and insert run in one transaction on the worker thread, so
    /// two concurrent callers can never be handed the same id. `make_payload`
    /// receives the assigned id so the serialized item carries it.
    pub async fn insert_new_cached<F>(&self, kind: &'static str, make_payload: F) -> Result<i64>
    where
        F: FnOnce(i64) -> Result<String> + Send + 'static,
    {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let min: Option<i64> = tx.query_row(
                "SELECT MIN(id) FROM cached_items WHERE kind = ?1 AND id < 0",
                params![kind],
                |row| row.get(0),
            )?;
            let id = min.unwrap_or(0) - 1;
            let payload = make_payload(id)?;
            tx.execute(
                "INSERT INTO cached_items (kind, id, payload, origin, last_synced_at)
                 VALUES (?1, ?2, ?3, 'local', NULL)",
                params![kind, id, payload],
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    /// Move a row to a new id (server reconciliation after a push).
    pub async fn rekey_cached(
        &self,
        kind: &'static str,
        old_id: i64,
        new_id: i64,
        payload: String,
        last_synced_at: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM cached_items WHERE kind = ?1 AND id = ?2",
                params![kind, old_id],
            )?;
            tx.execute(
                "INSERT INTO cached_items (kind, id, payload, origin, last_synced_at)
                 VALUES (?1, ?2, ?3, 'remote', ?4)
                 ON CONFLICT(kind, id) DO UPDATE SET
                     payload = excluded.payload,
                     origin = excluded.origin,
                     last_synced_at = excluded.last_synced_at",
                params![kind, new_id, payload, last_synced_at.to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Remove one item from a partition.
    pub async fn delete_cached(&self, kind: &'static str, id: i64) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM cached_items WHERE kind = ?1 AND id = ?2",
                params![kind, id],
            )?;
            Ok(())
        })
        .await
    }
}

fn init_schema(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS activity_records (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             start_time TEXT NOT NULL,
             end_time TEXT NOT NULL,
             duration_ms INTEGER NOT NULL,
             distance_m REAL NOT NULL,
             avg_speed_kmh REAL NOT NULL,
             max_speed_kmh REAL NOT NULL,
             calories INTEGER NOT NULL,
             route_json TEXT NOT NULL,
             thumbnail_path TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_activity_start
             ON activity_records(start_time DESC);
         CREATE TABLE IF NOT EXISTS cached_items (
             kind TEXT NOT NULL,
             id INTEGER NOT NULL,
             payload TEXT NOT NULL,
             origin TEXT NOT NULL,
             last_synced_at TEXT,
             PRIMARY KEY (kind, id)
         );",
    )
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| CoreError::Internal(anyhow!("value {value} exceeds SQLite INTEGER range")))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| CoreError::Database(format!("invalid datetime '{value}': {err}")))
}

struct RawRecordRow {
    id: i64,
    start_time: String,
    end_time: String,
    duration_ms: i64,
    distance_m: f64,
    avg_speed_kmh: f64,
    max_speed_kmh: f64,
    calories: i64,
    route_json: String,
    thumbnail_path: Option<String>,
}

fn raw_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecordRow> {
    Ok(RawRecordRow {
        id: row.get(0)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        duration_ms: row.get(3)?,
        distance_m: row.get(4)?,
        avg_speed_kmh: row.get(5)?,
        max_speed_kmh: row.get(6)?,
        calories: row.get(7)?,
        route_json: row.get(8)?,
        thumbnail_path: row.get(9)?,
    })
}

impl TryFrom<RawRecordRow> for ActivityRecord {
    type Error = CoreError;

    fn try_from(raw: RawRecordRow) -> Result<ActivityRecord> {
        let route: Vec<TrackPoint> = serde_json::from_str(&raw.route_json)
            .map_err(|e| CoreError::Database(format!("corrupt route_json: {e}")))?;
        Ok(ActivityRecord {
            id: raw.id,
            start_time: parse_datetime(&raw.start_time)?,
            end_time: parse_datetime(&raw.end_time)?,
            duration_ms: u64::try_from(raw.duration_ms).unwrap_or(0),
            distance_m: raw.distance_m,
            avg_speed_kmh: raw.avg_speed_kmh,
            max_speed_kmh: raw.max_speed_kmh,
            calories: u32::try_from(raw.calories).unwrap_or(0),
            route,
            thumbnail_path: raw.thumbnail_path,
        })
    }
}
