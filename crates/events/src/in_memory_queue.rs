//! In-memory queue for tests/dev.

use std::collections::VecDeque;
use std::sync::Mutex;

use catalog_core::MessageId;

use crate::queue::{MessageQueue, QueueError};
use crate::Envelope;

/// In-memory FIFO queue.
///
/// - No IO, not durable across processes
/// - Pop is exclusive within the process (single mutex)
#[derive(Debug)]
pub struct InMemoryQueue<M> {
    messages: Mutex<VecDeque<Envelope<M>>>,
}

impl<M> InMemoryQueue<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: Clone> InMemoryQueue<M> {
    /// Copy of the pending messages, oldest first.
    pub fn pending(&self) -> Result<Vec<M>, QueueError> {
        let messages = self.messages.lock().map_err(|_| QueueError::Poisoned)?;
        Ok(messages.iter().map(|e| e.message().clone()).collect())
    }
}

impl<M> Default for InMemoryQueue<M> {
    fn default() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
        }
    }
}

impl<M> MessageQueue<M> for InMemoryQueue<M>
where
    M: Send,
{
    fn add(&self, message: M) -> Result<MessageId, QueueError> {
        let envelope = Envelope::wrap(message);
        let id = envelope.message_id();
        self.messages
            .lock()
            .map_err(|_| QueueError::Poisoned)?
            .push_back(envelope);
        Ok(id)
    }

    fn len(&self) -> Result<usize, QueueError> {
        Ok(self.messages.lock().map_err(|_| QueueError::Poisoned)?.len())
    }

    fn pop(&self) -> Result<Option<Envelope<M>>, QueueError> {
        Ok(self
            .messages
            .lock()
            .map_err(|_| QueueError::Poisoned)?
            .pop_front())
    }
}
