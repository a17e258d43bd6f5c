//! Redis list-backed queue (durable, exclusive pop).
//!
//! Each logical queue is one Redis list:
//! - `add` → `RPUSH` of the JSON envelope
//! - `len` → `LLEN`
//! - `pop` → `LPOP`, which Redis executes atomically, so concurrent consumers in
//!   different processes never receive the same message
//!
//! Durability is whatever the Redis server is configured for (AOF/RDB).

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use catalog_core::MessageId;
use catalog_events::{Envelope, MessageQueue, QueueError};

/// Default key prefix for queue lists
const DEFAULT_KEY_PREFIX: &str = "catalog:queue";

#[derive(Debug)]
pub struct RedisListQueue<M> {
    client: Arc<redis::Client>,
    key: String,
    timeout: Duration,
    _message: PhantomData<fn() -> M>,
}

impl<M> Clone for RedisListQueue<M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            key: self.key.clone(),
            timeout: self.timeout,
            _message: PhantomData,
        }
    }
}

impl<M> RedisListQueue<M> {
    /// Create a queue handle.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `queue_name` - logical queue name; the list key is `catalog:queue:<name>`
    /// * `timeout` - connect/read/write timeout for every call
    pub fn new(
        redis_url: impl AsRef<str>,
        queue_name: &str,
        timeout: Duration,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| QueueError::Unavailable(format!("invalid redis url: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            key: format!("{DEFAULT_KEY_PREFIX}:{queue_name}"),
            timeout,
            _message: PhantomData,
        })
    }

    /// Another logical queue on the same server.
    pub fn sibling<N>(&self, queue_name: &str) -> RedisListQueue<N> {
        RedisListQueue {
            client: self.client.clone(),
            key: format!("{DEFAULT_KEY_PREFIX}:{queue_name}"),
            timeout: self.timeout,
            _message: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn connection(&self) -> Result<redis::Connection, QueueError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        conn.set_read_timeout(Some(self.timeout))
            .and_then(|_| conn.set_write_timeout(Some(self.timeout)))
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(conn)
    }
}

impl<M> MessageQueue<M> for RedisListQueue<M>
where
    M: Serialize + DeserializeOwned,
{
    #[instrument(skip(self, message), fields(key = %self.key), err)]
    fn add(&self, message: M) -> Result<MessageId, QueueError> {
        let envelope = Envelope::wrap(message);
        let payload = serde_json::to_string(&envelope)
            .map_err(|e| QueueError::Enqueue(format!("message serialization failed: {e}")))?;

        let mut conn = self.connection()?;
        let _: i64 = redis::cmd("RPUSH")
            .arg(&self.key)
            .arg(payload)
            .query(&mut conn)
            .map_err(push_error)?;

        Ok(envelope.message_id())
    }

    fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.connection()?;
        redis::cmd("LLEN")
            .arg(&self.key)
            .query(&mut conn)
            .map_err(|e| QueueError::Unavailable(e.to_string()))
    }

    fn pop(&self) -> Result<Option<Envelope<M>>, QueueError> {
        let mut conn = self.connection()?;
        let raw: Option<String> = redis::cmd("LPOP")
            .arg(&self.key)
            .query(&mut conn)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        raw.map(|payload| {
            serde_json::from_str(&payload).map_err(|e| QueueError::Decode {
                message_id: None,
                reason: e.to_string(),
            })
        })
        .transpose()
    }
}

/// Lost connections and timeouts mean the server is unavailable; an error reply
/// (wrong key type, out of memory) is a rejection of this push.
fn push_error(e: redis::RedisError) -> QueueError {
    if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal() {
        QueueError::Unavailable(e.to_string())
    } else {
        QueueError::Enqueue(e.to_string())
    }
}
