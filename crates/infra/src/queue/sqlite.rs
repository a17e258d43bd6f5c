//! SQLite-backed queue.
//!
//! Messages of every logical queue live in one table, `queue_messages`, keyed by
//! an autoincrement `seq` that defines FIFO order. Several processes may share the
//! file: `pop` is a single `DELETE ... RETURNING` statement, which SQLite executes
//! under its write lock, so each row is handed to exactly one consumer.
//!
//! The queue contract is synchronous; sqlx is async. Each queue owns (or shares) a
//! small current-thread tokio runtime and blocks on it, with every call bounded by
//! the configured timeout. Do not call these methods from inside another tokio
//! runtime.

use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

use catalog_core::MessageId;
use catalog_events::{Envelope, MessageQueue, QueueError};

/// Durable FIFO queue stored in a SQLite file.
///
/// Cheap to clone; clones share the pool and runtime.
#[derive(Debug)]
pub struct SqliteQueue<M> {
    pool: SqlitePool,
    runtime: Arc<Runtime>,
    queue_name: String,
    timeout: Duration,
    _message: PhantomData<fn() -> M>,
}

impl<M> Clone for SqliteQueue<M> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            runtime: self.runtime.clone(),
            queue_name: self.queue_name.clone(),
            timeout: self.timeout,
            _message: PhantomData,
        }
    }
}

impl<M> SqliteQueue<M> {
    /// Open (creating if needed) the queue file and its schema.
    pub fn open(
        path: impl AsRef<Path>,
        queue_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, QueueError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                QueueError::Unavailable(format!("failed to create queue directory {}: {e}", parent.display()))
            })?;
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| QueueError::Unavailable(format!("failed to start queue runtime: {e}")))?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(timeout);

        let pool = runtime.block_on(async {
            let pool = tokio::time::timeout(
                timeout,
                SqlitePoolOptions::new()
                    .max_connections(4)
                    .acquire_timeout(timeout)
                    .connect_with(options),
            )
            .await
            .map_err(|_| QueueError::Unavailable(format!("timed out opening {}", path.display())))?
            .map_err(|e| QueueError::Unavailable(format!("failed to open {}: {e}", path.display())))?;

            ensure_schema(&pool).await?;
            Ok::<_, QueueError>(pool)
        })?;

        debug!(path = %path.display(), "sqlite queue opened");

        Ok(Self {
            pool,
            runtime: Arc::new(runtime),
            queue_name: queue_name.into(),
            timeout,
            _message: PhantomData,
        })
    }

    /// Another logical queue in the same file, sharing this queue's pool.
    pub fn sibling<N>(&self, queue_name: impl Into<String>) -> SqliteQueue<N> {
        SqliteQueue {
            pool: self.pool.clone(),
            runtime: self.runtime.clone(),
            queue_name: queue_name.into(),
            timeout: self.timeout,
            _message: PhantomData,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn block_on<T>(
        &self,
        operation: &str,
        fut: impl std::future::Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, QueueError> {
        self.runtime
            .block_on(async { tokio::time::timeout(self.timeout, fut).await })
            .map_err(|_| {
                QueueError::Unavailable(format!("{operation} timed out after {:?}", self.timeout))
            })?
            .map_err(|e| QueueError::Unavailable(format!("{operation} failed: {e}")))
    }
}

async fn ensure_schema(pool: &SqlitePool) -> Result<(), QueueError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_messages (
            seq          INTEGER PRIMARY KEY AUTOINCREMENT,
            queue_name   TEXT NOT NULL,
            message_id   TEXT NOT NULL,
            enqueued_at  TEXT NOT NULL,
            body         TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| QueueError::Unavailable(format!("failed to create queue_messages table: {e}")))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS queue_messages_by_queue ON queue_messages (queue_name, seq)",
    )
    .execute(pool)
    .await
    .map_err(|e| QueueError::Unavailable(format!("failed to create queue_messages index: {e}")))?;

    Ok(())
}

impl<M> MessageQueue<M> for SqliteQueue<M>
where
    M: Serialize + DeserializeOwned,
{
    #[instrument(skip(self, message), fields(queue = %self.queue_name), err)]
    fn add(&self, message: M) -> Result<MessageId, QueueError> {
        let body = serde_json::to_string(&message)
            .map_err(|e| QueueError::Enqueue(format!("message serialization failed: {e}")))?;
        let message_id = MessageId::new();
        let enqueued_at = Utc::now();

        // The table has no constraints a row could violate, so a failed insert
        // means the backend is unavailable, not that this message was refused.
        self.block_on(
            "insert",
            sqlx::query(
                r#"
                INSERT INTO queue_messages (queue_name, message_id, enqueued_at, body)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&self.queue_name)
            .bind(message_id.to_string())
            .bind(enqueued_at.to_rfc3339())
            .bind(body)
            .execute(&self.pool),
        )?;

        Ok(message_id)
    }

    fn len(&self) -> Result<usize, QueueError> {
        let row = self.block_on(
            "count",
            sqlx::query("SELECT COUNT(*) AS pending FROM queue_messages WHERE queue_name = ?1")
                .bind(&self.queue_name)
                .fetch_one(&self.pool),
        )?;
        let pending: i64 = row
            .try_get("pending")
            .map_err(|e| QueueError::Unavailable(format!("count failed: {e}")))?;
        Ok(usize::try_from(pending).unwrap_or(0))
    }

    fn pop(&self) -> Result<Option<Envelope<M>>, QueueError> {
        let row = self.block_on(
            "pop",
            sqlx::query(
                r#"
                DELETE FROM queue_messages
                WHERE seq = (
                    SELECT seq FROM queue_messages
                    WHERE queue_name = ?1
                    ORDER BY seq ASC
                    LIMIT 1
                )
                RETURNING message_id, enqueued_at, body
                "#,
            )
            .bind(&self.queue_name)
            .fetch_optional(&self.pool),
        )?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw_id: String = row.try_get("message_id").map_err(|e| decode(None, e))?;
        let message_id = MessageId::from_str(&raw_id).map_err(|e| decode(None, e))?;
        let enqueued_at: String = row
            .try_get("enqueued_at")
            .map_err(|e| decode(Some(message_id), e))?;
        let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_at)
            .map_err(|e| decode(Some(message_id), e))?
            .with_timezone(&Utc);
        let body: String = row.try_get("body").map_err(|e| decode(Some(message_id), e))?;
        let message: M = serde_json::from_str(&body).map_err(|e| decode(Some(message_id), e))?;

        Ok(Some(Envelope::new(message_id, enqueued_at, message)))
    }
}

fn decode(message_id: Option<MessageId>, reason: impl std::fmt::Display) -> QueueError {
    QueueError::Decode {
        message_id,
        reason: reason.to_string(),
    }
}
