//! Durable FIFO queue contract (mechanics only).
//!
//! Two independent instances exist in a running pipeline: the domain-event queue
//! and the command queue. Both are **at-least-once**, **FIFO per instance**, and
//! drained in batches by on-demand consumers rather than long-running subscribers.
//!
//! ## Snapshot drain
//!
//! [`MessageQueue::consume_all`] counts the pending messages once and pops exactly
//! that many. Messages added while a drain is running are left for the next
//! invocation instead of extending the current one, which keeps a drain bounded
//! even while producers keep appending. If another consumer empties the queue
//! first, the drain simply stops early.
//!
//! ## Failure model
//!
//! - Handler failures are recorded in the [`DrainSummary`] and the drain moves on.
//!   The failed message is considered consumed; it is not re-enqueued.
//! - An undecodable message is likewise recorded and skipped.
//! - Any other backend error ends the drain with `Err`; re-invoke to resume. A
//!   handler ends it the same way by returning [`HandlerError::Abort`] when a
//!   backend it writes to is unavailable.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use catalog_core::MessageId;

use crate::summary::{DrainSummary, HandlingError, HandlingFailure, MessageFailure};
use crate::Envelope;

/// Queue backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `add` was rejected; nothing was persisted.
    #[error("enqueue failed: {0}")]
    Enqueue(String),

    /// The backend could not be reached or did not answer in time.
    #[error("queue backend unavailable: {0}")]
    Unavailable(String),

    /// A message was popped but could not be decoded. It is gone from the queue.
    #[error("could not decode message {message_id:?}: {reason}")]
    Decode {
        message_id: Option<MessageId>,
        reason: String,
    },

    /// In-process lock poisoning.
    #[error("queue lock poisoned")]
    Poisoned,
}

/// Why a drain handler did not complete a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// This message failed. It is recorded and the drain moves on.
    #[error(transparent)]
    Message(#[from] HandlingFailure),

    /// A backend the handler depends on is unavailable. The drain stops and
    /// returns this error.
    #[error("drain aborted: {0}")]
    Abort(QueueError),
}

impl From<HandlingError> for HandlerError {
    fn from(value: HandlingError) -> Self {
        Self::Message(value.into())
    }
}

/// Message handler invoked by [`MessageQueue::consume_all`].
pub type DrainHandler<'a, M> = dyn FnMut(Envelope<M>) -> Result<(), HandlerError> + 'a;

/// A durable, ordered, at-least-once message channel.
///
/// ## Implementation requirements
///
/// - `add` appends durably before returning, or fails with [`QueueError::Enqueue`]
///   (or [`QueueError::Unavailable`]) without persisting anything.
/// - `pop` removes and returns the oldest message. Pop must be exclusive across
///   processes sharing the backend: one message, one consumer.
/// - Blocking calls must give up after the backend's configured timeout instead
///   of hanging.
///
/// The trait requires `Send + Sync` so one queue handle can be shared by the
/// dispatcher and both consumers.
pub trait MessageQueue<M>: Send + Sync {
    /// Append a message, returning the transport id assigned to it.
    fn add(&self, message: M) -> Result<MessageId, QueueError>;

    /// Number of messages currently pending.
    fn len(&self) -> Result<usize, QueueError>;

    /// Remove and return the oldest pending message.
    fn pop(&self) -> Result<Option<Envelope<M>>, QueueError>;

    fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }

    /// Drain every message pending at the moment of the call, in enqueue order.
    fn consume_all(&self, handler: &mut DrainHandler<'_, M>) -> Result<DrainSummary, QueueError> {
        drain(self, handler)
    }
}

/// Snapshot drain shared by every backend.
pub fn drain<M, Q>(queue: &Q, handler: &mut DrainHandler<'_, M>) -> Result<DrainSummary, QueueError>
where
    Q: MessageQueue<M> + ?Sized,
{
    let pending = queue.len()?;
    let mut summary = DrainSummary::default();

    for _ in 0..pending {
        let envelope = match queue.pop() {
            Ok(Some(envelope)) => envelope,
            // Another consumer got there first.
            Ok(None) => break,
            Err(QueueError::Decode { message_id, reason }) => {
                warn!(message_id = ?message_id, reason = %reason, "dropping undecodable message");
                summary.record_failure(MessageFailure::new(message_id, HandlingError::Decode(reason)));
                continue;
            }
            Err(err) => return Err(err),
        };

        let message_id = envelope.message_id();
        match handler(envelope) {
            Ok(()) => summary.record_success(),
            Err(HandlerError::Message(failure)) => {
                warn!(message_id = %message_id, error = %failure, "message handling failed");
                summary.record_failure(MessageFailure::new(Some(message_id), failure));
            }
            Err(HandlerError::Abort(err)) => {
                warn!(
                    message_id = %message_id,
                    handled = summary.attempted,
                    error = %err,
                    "drain aborted"
                );
                return Err(err);
            }
        }
    }

    Ok(summary)
}

impl<M, Q> MessageQueue<M> for Arc<Q>
where
    Q: MessageQueue<M> + ?Sized,
{
    fn add(&self, message: M) -> Result<MessageId, QueueError> {
        (**self).add(message)
    }

    fn len(&self) -> Result<usize, QueueError> {
        (**self).len()
    }

    fn pop(&self) -> Result<Option<Envelope<M>>, QueueError> {
        (**self).pop()
    }

    fn is_empty(&self) -> Result<bool, QueueError> {
        (**self).is_empty()
    }

    fn consume_all(&self, handler: &mut DrainHandler<'_, M>) -> Result<DrainSummary, QueueError> {
        (**self).consume_all(handler)
    }
}
