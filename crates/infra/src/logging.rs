//! Debug logging decorators.
//!
//! Each wrapper forwards to the real component and logs the call at `debug`
//! level. They are wired in by the bootstrap code when debug logging is enabled,
//! so production paths pay nothing when it is off.

use tracing::{debug, warn};

use catalog_core::MessageId;
use catalog_events::{
    Command, CommandError, CommandHandler, DomainEvent, Envelope, MessageQueue, ProjectionError,
    Projector, QueueError,
};

/// Logs every add and pop of the wrapped queue.
#[derive(Debug, Clone)]
pub struct LoggingQueue<Q> {
    name: &'static str,
    inner: Q,
}

impl<Q> LoggingQueue<Q> {
    pub fn new(name: &'static str, inner: Q) -> Self {
        Self { name, inner }
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }
}

impl<M, Q> MessageQueue<M> for LoggingQueue<Q>
where
    Q: MessageQueue<M>,
    M: core::fmt::Debug,
{
    fn add(&self, message: M) -> Result<MessageId, QueueError> {
        let described = format!("{message:?}");
        match self.inner.add(message) {
            Ok(id) => {
                debug!(queue = self.name, message_id = %id, message = %described, "message added");
                Ok(id)
            }
            Err(err) => {
                warn!(queue = self.name, message = %described, error = %err, "add failed");
                Err(err)
            }
        }
    }

    fn len(&self) -> Result<usize, QueueError> {
        self.inner.len()
    }

    fn pop(&self) -> Result<Option<Envelope<M>>, QueueError> {
        let popped = self.inner.pop()?;
        if let Some(env) = &popped {
            debug!(
                queue = self.name,
                message_id = %env.message_id(),
                enqueued_at = %env.enqueued_at(),
                message = ?env.message(),
                "message popped"
            );
        }
        Ok(popped)
    }
}

/// Logs every projection, its outcome and the commands it produced.
#[derive(Debug, Clone)]
pub struct LoggingProjector<P> {
    inner: P,
}

impl<P> LoggingProjector<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: Projector> Projector for LoggingProjector<P> {
    fn code(&self) -> &str {
        self.inner.code()
    }

    fn event_type(&self) -> &str {
        self.inner.event_type()
    }

    fn project(&self, event: &DomainEvent) -> Result<Vec<Command>, ProjectionError> {
        debug!(
            projector_code = self.inner.code(),
            event_type = event.event_type(),
            data_version = %event.data_version(),
            "projecting event"
        );
        let result = self.inner.project(event);
        match &result {
            Ok(commands) => debug!(
                projector_code = self.inner.code(),
                commands = commands.len(),
                "projection finished"
            ),
            Err(err) => debug!(projector_code = self.inner.code(), error = %err, "projection failed"),
        }
        result
    }
}

/// Logs every command handled and its outcome.
#[derive(Debug, Clone)]
pub struct LoggingCommandHandler<H> {
    inner: H,
}

impl<H> LoggingCommandHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: CommandHandler> CommandHandler for LoggingCommandHandler<H> {
    fn command_type(&self) -> &str {
        self.inner.command_type()
    }

    fn handle(&self, command: &Command) -> Result<(), CommandError> {
        debug!(
            command_type = command.command_type(),
            parameters = %command.parameters(),
            "handling command"
        );
        let result = self.inner.handle(command);
        if let Err(err) = &result {
            debug!(command_type = command.command_type(), error = %err, "command failed");
        }
        result
    }
}
