//! SQLite store for episodes, facts and state snapshots.
//!
//! Uses a single SQLite database file with three tables:
//! - `episodic_memory`: append-only log of inputs and responses
//! - `semantic_memory`: key/value facts, upserted by key
//! - `internal_states`: append-only snapshots of the self model
//!
//! Schema evolution is additive only: missing nullable columns are added with
//! `ALTER TABLE ... ADD COLUMN` during initialization.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentia_core::error::MemoryError;
use sentia_core::memory::{
    EpisodicMemoryRecord, InternalStateSnapshot, MemoryStore, NewEpisode, SemanticMemoryRecord,
};
use sentia_core::InternalState;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// A SQLite-backed [`MemoryStore`].
pub struct SqliteStore {
    pool: SqlitePool,
    closed: AtomicBool,
}

impl SqliteStore {
    /// Open (creating if missing) the database file at `path` and initialize it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite memory store initialized at {}", path.display());
        Ok(store)
    }

    /// An ephemeral in-process database.
    ///
    /// Each SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        Self::from_pool(pool).await
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self {
            pool,
            closed: AtomicBool::new(false),
        };
        store.initialize().await?;
        Ok(store)
    }

    fn ensure_open(&self) -> Result<(), MemoryError> {
        if self.closed.load(Ordering::Acquire) {
            Err(MemoryError::Closed)
        } else {
            Ok(())
        }
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS episodic_memory (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   INTEGER NOT NULL,
                event_type  TEXT NOT NULL,
                content     TEXT NOT NULL,
                metadata    TEXT,
                created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("episodic_memory table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS semantic_memory (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                key           TEXT UNIQUE NOT NULL,
                value         TEXT NOT NULL,
                confidence    REAL NOT NULL DEFAULT 1.0,
                last_updated  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("semantic_memory table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS internal_states (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   INTEGER NOT NULL,
                energy      REAL NOT NULL,
                mood        REAL NOT NULL,
                confidence  REAL NOT NULL,
                events      TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("internal_states table: {e}")))?;

        self.ensure_column("episodic_memory", "session_id", "TEXT").await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_episodic_timestamp ON episodic_memory(timestamp DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("episodic index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_states_timestamp ON internal_states(timestamp DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("states index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Add a nullable column if an older database lacks it.
    async fn ensure_column(&self, table: &str, column: &str, ty: &str) -> Result<(), MemoryError> {
        let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::MigrationFailed(format!("table_info {table}: {e}")))?;

        let exists = rows
            .iter()
            .any(|row| row.try_get::<String, _>("name").is_ok_and(|name| name == column));
        if exists {
            return Ok(());
        }

        sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {ty}"))
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::MigrationFailed(format!("add {table}.{column}: {e}")))?;
        info!("Added column {table}.{column}");
        Ok(())
    }

    fn row_to_episode(row: &sqlx::sqlite::SqliteRow) -> Result<EpisodicMemoryRecord, MemoryError> {
        let metadata: Option<String> = row
            .try_get("metadata")
            .map_err(|e| MemoryError::QueryFailed(format!("metadata column: {e}")))?;
        let metadata = match metadata {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| MemoryError::Serialization(format!("episode metadata: {e}")))?,
            None => serde_json::Value::Null,
        };

        Ok(EpisodicMemoryRecord {
            id: get(row, "id")?,
            timestamp: get(row, "timestamp")?,
            event_type: get(row, "event_type")?,
            content: get(row, "content")?,
            metadata,
            session_id: get(row, "session_id")?,
            created_at: parse_time(&get::<String>(row, "created_at")?),
        })
    }

    fn row_to_snapshot(row: &sqlx::sqlite::SqliteRow) -> Result<InternalStateSnapshot, MemoryError> {
        let events_json: String = get(row, "events")?;
        let events: Vec<String> = serde_json::from_str(&events_json)
            .map_err(|e| MemoryError::Serialization(format!("snapshot events: {e}")))?;

        Ok(InternalStateSnapshot {
            id: get(row, "id")?,
            timestamp: get(row, "timestamp")?,
            energy: get(row, "energy")?,
            mood: get(row, "mood")?,
            confidence: get(row, "confidence")?,
            events,
            created_at: parse_time(&get::<String>(row, "created_at")?),
        })
    }
}

fn get<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, MemoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| MemoryError::QueryFailed(format!("{column} column: {e}")))
}

/// Accepts RFC 3339 and SQLite's `CURRENT_TIMESTAMP` format.
fn parse_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl MemoryStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), MemoryError> {
        self.ensure_open()?;
        self.run_migrations().await
    }

    async fn store_episodic_memory(&self, episode: NewEpisode) -> Result<i64, MemoryError> {
        self.ensure_open()?;
        let metadata = serde_json::to_string(&episode.metadata)
            .map_err(|e| MemoryError::Serialization(format!("episode metadata: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO episodic_memory (timestamp, event_type, content, metadata, session_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(episode.timestamp)
        .bind(&episode.event_type)
        .bind(&episode.content)
        .bind(&metadata)
        .bind(&episode.session_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT episode failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, event_type = %episode.event_type, "Stored episode");
        Ok(id)
    }

    async fn recent_memories(&self, limit: usize) -> Result<Vec<EpisodicMemoryRecord>, MemoryError> {
        self.ensure_open()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT * FROM episodic_memory ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("recent episodes: {e}")))?;

        rows.iter().map(Self::row_to_episode).collect()
    }

    async fn store_semantic_memory(
        &self,
        key: &str,
        value: serde_json::Value,
        confidence: f64,
    ) -> Result<(), MemoryError> {
        self.ensure_open()?;
        let value = serde_json::to_string(&value)
            .map_err(|e| MemoryError::Serialization(format!("semantic value: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO semantic_memory (key, value, confidence, last_updated)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                confidence = excluded.confidence,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(key)
        .bind(&value)
        .bind(confidence)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("UPSERT fact failed: {e}")))?;

        debug!(key, "Stored fact");
        Ok(())
    }

    async fn semantic_memory(&self, key: &str) -> Result<Option<SemanticMemoryRecord>, MemoryError> {
        self.ensure_open()?;
        let row = sqlx::query("SELECT * FROM semantic_memory WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("fact lookup: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = get(&row, "value")?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| MemoryError::Serialization(format!("semantic value: {e}")))?;

        Ok(Some(SemanticMemoryRecord {
            key: get(&row, "key")?,
            value,
            confidence: get(&row, "confidence")?,
            last_updated: parse_time(&get::<String>(&row, "last_updated")?),
        }))
    }

    async fn store_internal_state(&self, state: &InternalState) -> Result<i64, MemoryError> {
        self.ensure_open()?;
        let events = serde_json::to_string(&state.recent_events)
            .map_err(|e| MemoryError::Serialization(format!("snapshot events: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO internal_states (timestamp, energy, mood, confidence, events, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(Utc::now().timestamp_millis())
        .bind(state.energy)
        .bind(state.mood)
        .bind(state.confidence)
        .bind(&events)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT snapshot failed: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    async fn latest_internal_state(&self) -> Result<Option<InternalStateSnapshot>, MemoryError> {
        self.ensure_open()?;
        let row = sqlx::query("SELECT * FROM internal_states ORDER BY timestamp DESC, id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("latest snapshot: {e}")))?;

        row.as_ref().map(Self::row_to_snapshot).transpose()
    }

    async fn internal_state_count(&self) -> Result<usize, MemoryError> {
        self.ensure_open()?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM internal_states")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("snapshot count: {e}")))?;
        Ok(count as usize)
    }

    async fn close(&self) -> Result<(), MemoryError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.pool.close().await;
            info!("SQLite memory store closed");
        }
        Ok(())
    }
}
