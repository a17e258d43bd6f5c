use std::sync::Arc;

use thiserror::Error;

use crate::{Command, DomainEvent};

/// Failure raised by a projector while handling an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// The event payload could not be interpreted by this projector.
    #[error("invalid projection source: {0}")]
    InvalidPayload(String),

    /// The projector could not produce its output (missing source, IO, ...).
    #[error("projection failed: {0}")]
    Failed(String),
}

impl ProjectionError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }
}

/// Reacts to domain events of one type and derives follow-up commands.
///
/// A projector is identified by a **code** that is unique within a process and
/// stable across processes; callers use it to request work before anything is
/// enqueued. It declares the single `event_type` it handles, which is how the
/// domain-event consumer finds it at drain time.
///
/// ## Statelessness
///
/// `project` takes `&self`. A projector should hold only configuration; every
/// observable effect goes through the commands it returns, which the consumer
/// appends to the command queue.
///
/// ## Errors
///
/// Returning an error marks the event as failed for this projector only. Other
/// projectors for the same event, and later events, are still processed. Commands
/// are only enqueued for successful projections.
pub trait Projector: Send + Sync {
    /// Stable projector code (e.g. a template id such as `"header"`).
    fn code(&self) -> &str;

    /// The domain event type this projector handles.
    fn event_type(&self) -> &str;

    /// Handle one event, returning zero or more commands to enqueue.
    fn project(&self, event: &DomainEvent) -> Result<Vec<Command>, ProjectionError>;
}

impl<P> Projector for Arc<P>
where
    P: Projector + ?Sized,
{
    fn code(&self) -> &str {
        (**self).code()
    }

    fn event_type(&self) -> &str {
        (**self).event_type()
    }

    fn project(&self, event: &DomainEvent) -> Result<Vec<Command>, ProjectionError> {
        (**self).project(event)
    }
}
