use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::MessageId;

/// Transport wrapper a queue puts around every message it stores.
///
/// This is the unit backends persist and hand back from `pop`.
///
/// Notes:
/// - `message_id` is assigned at `add` time and is only used for reporting.
/// - `enqueued_at` is wall-clock time of the add; FIFO order is the backend's
///   append order, never this timestamp.
/// - `message` must round-trip bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    message_id: MessageId,
    enqueued_at: DateTime<Utc>,
    message: M,
}

impl<M> Envelope<M> {
    pub fn new(message_id: MessageId, enqueued_at: DateTime<Utc>, message: M) -> Self {
        Self {
            message_id,
            enqueued_at,
            message,
        }
    }

    /// Wrap a freshly added message with a new id and the current time.
    pub fn wrap(message: M) -> Self {
        Self::new(MessageId::new(), Utc::now(), message)
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn into_message(self) -> M {
        self.message
    }
}
