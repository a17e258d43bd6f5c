use std::sync::Arc;

use tracing::{debug, instrument, warn};

use catalog_events::{
    Command, DrainSummary, Envelope, HandlerError, HandlingError, HandlingFailure, MessageQueue,
    QueueError,
};

use crate::registry::CommandHandlerRegistry;

/// Drains the command queue, running the single handler registered per command type.
///
/// A command without a handler is recorded as
/// [`HandlingError::NoHandlerForCommand`] and counts as consumed.
pub struct CommandConsumer<C> {
    commands: C,
    handlers: Arc<CommandHandlerRegistry>,
}

impl<C> CommandConsumer<C>
where
    C: MessageQueue<Command>,
{
    pub fn new(commands: C, handlers: Arc<CommandHandlerRegistry>) -> Self {
        Self { commands, handlers }
    }

    /// Drain every command pending at call time.
    #[instrument(name = "command_consumer.process_all", skip(self), err)]
    pub fn process_all(&self) -> Result<DrainSummary, QueueError> {
        let mut invocations = 0usize;
        let mut summary = self
            .commands
            .consume_all(&mut |envelope| {
                self.handle(envelope, &mut invocations)
                    .map_err(HandlerError::from)
            })?;

        summary.invocations = invocations;
        debug!(
            attempted = summary.attempted,
            failed = summary.failed(),
            "command queue drained"
        );
        Ok(summary)
    }

    fn handle(&self, envelope: Envelope<Command>, invocations: &mut usize) -> Result<(), HandlingFailure> {
        let message_id = envelope.message_id();
        let command = envelope.into_message();

        let handler = self.handlers.handler_for(command.command_type()).map_err(|_| {
            warn!(%message_id, command_type = command.command_type(), "no handler for command");
            HandlingError::NoHandlerForCommand {
                command_type: command.command_type().to_string(),
            }
        })?;

        *invocations += 1;
        handler.handle(&command).map_err(|error| {
            warn!(%message_id, command_type = command.command_type(), error = %error, "command failed");
            HandlingError::CommandExecution {
                command_type: command.command_type().to_string(),
                error,
            }
        })?;

        Ok(())
    }
}
