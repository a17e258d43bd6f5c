use std::collections::HashMap;
use std::sync::Arc;

use catalog_events::CommandHandler;

use super::RegistryError;

/// One handler per command type.
#[derive(Clone, Default)]
pub struct CommandHandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandHandlerRegistry {
    pub fn builder() -> CommandHandlerRegistryBuilder {
        CommandHandlerRegistryBuilder::default()
    }

    pub fn handler_for(&self, command_type: &str) -> Result<&Arc<dyn CommandHandler>, RegistryError> {
        self.handlers
            .get(command_type)
            .ok_or_else(|| RegistryError::NoHandlerForCommand(command_type.to_string()))
    }

    pub fn command_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl core::fmt::Debug for CommandHandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandHandlerRegistry")
            .field("command_types", &self.command_types())
            .finish()
    }
}

#[derive(Default)]
pub struct CommandHandlerRegistryBuilder {
    registry: CommandHandlerRegistry,
}

impl CommandHandlerRegistryBuilder {
    pub fn register(self, handler: impl CommandHandler + 'static) -> Result<Self, RegistryError> {
        self.register_shared(Arc::new(handler))
    }

    pub fn register_shared(mut self, handler: Arc<dyn CommandHandler>) -> Result<Self, RegistryError> {
        let command_type = handler.command_type().to_string();
        if self.registry.handlers.contains_key(&command_type) {
            return Err(RegistryError::DuplicateCommandHandler(command_type));
        }
        self.registry.handlers.insert(command_type, handler);
        Ok(self)
    }

    pub fn build(self) -> CommandHandlerRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use catalog_events::{Command, CommandError};

    use super::*;

    struct Noop(&'static str);

    impl CommandHandler for Noop {
        fn command_type(&self) -> &str {
            self.0
        }

        fn handle(&self, _command: &Command) -> Result<(), CommandError> {
            Ok(())
        }
    }

    #[test]
    fn handler_lookup_by_command_type() {
        let registry = CommandHandlerRegistry::builder()
            .register(Noop("write-file"))
            .unwrap()
            .build();

        assert_eq!(registry.handler_for("write-file").unwrap().command_type(), "write-file");
        assert_eq!(
            registry.handler_for("delete-file").err(),
            Some(RegistryError::NoHandlerForCommand("delete-file".into()))
        );
    }

    #[test]
    fn second_handler_for_a_type_is_rejected() {
        let err = CommandHandlerRegistry::builder()
            .register(Noop("write-file"))
            .unwrap()
            .register(Noop("write-file"))
            .err();
        assert_eq!(err, Some(RegistryError::DuplicateCommandHandler("write-file".into())));
    }
}
