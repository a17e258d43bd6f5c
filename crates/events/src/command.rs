use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use catalog_core::ValueObject;

/// An instruction to perform exactly one side effect.
///
/// Commands are produced by projectors while handling a [`DomainEvent`] and are
/// consumed by the single [`CommandHandler`] registered for `command_type`.
///
/// ## Command vs Event
///
/// - **Event**: fact about the imported data ("template `header` was updated")
/// - **Command**: work derived from that fact ("write file `header.html`")
///
/// Parameters are opaque JSON; only the handler for `command_type` interprets them.
///
/// [`DomainEvent`]: crate::DomainEvent
/// [`CommandHandler`]: crate::CommandHandler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    command_type: String,
    parameters: JsonValue,
}

impl Command {
    pub fn new(command_type: impl Into<String>, parameters: JsonValue) -> Self {
        Self {
            command_type: command_type.into(),
            parameters,
        }
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    pub fn parameters(&self) -> &JsonValue {
        &self.parameters
    }

    pub fn into_parameters(self) -> JsonValue {
        self.parameters
    }
}

impl ValueObject for Command {}
