use std::sync::Arc;

use thiserror::Error;

use crate::Command;

/// Failure raised by a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Parameters are missing or have the wrong shape for this command type.
    #[error("invalid command parameters: {0}")]
    InvalidParameters(String),

    /// The side effect itself failed.
    #[error("command failed: {0}")]
    Failed(String),
}

impl CommandError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }
}

/// Performs the side effect behind one command type.
///
/// Exactly one handler is registered per `command_type`. Handlers run
/// sequentially inside a drain; a handler that starts runs to completion or
/// failure before the next command is popped.
///
/// A failed command is reported in the drain summary and is **not** re-enqueued.
pub trait CommandHandler: Send + Sync {
    fn command_type(&self) -> &str;

    fn handle(&self, command: &Command) -> Result<(), CommandError>;
}

impl<H> CommandHandler for Arc<H>
where
    H: CommandHandler + ?Sized,
{
    fn command_type(&self) -> &str {
        (**self).command_type()
    }

    fn handle(&self, command: &Command) -> Result<(), CommandError> {
        (**self).handle(command)
    }
}
