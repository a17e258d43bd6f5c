//! Code → behaviour lookup tables, built once at startup.
//!
//! Both registries are plain maps filled by a builder and frozen afterwards; there
//! is no runtime registration. Resolution by string code is the only dynamic step.

pub mod handlers;
pub mod projectors;

use thiserror::Error;

pub use handlers::{CommandHandlerRegistry, CommandHandlerRegistryBuilder};
pub use projectors::{ProjectorRegistry, ProjectorRegistryBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("projector code \"{0}\" is registered twice")]
    DuplicateProjectorCode(String),

    #[error("command type \"{0}\" already has a handler")]
    DuplicateCommandHandler(String),

    #[error("projector code must not be empty")]
    EmptyProjectorCode,

    #[error("unknown projector code \"{0}\"")]
    UnknownProjectorCode(String),

    #[error("no handler registered for command type \"{0}\"")]
    NoHandlerForCommand(String),
}
