//! Infrastructure layer: registries, consumers, the dispatcher and the durable
//! queue backends that carry domain events and commands.

pub mod config;
pub mod consumer;
pub mod data_pool;
pub mod dispatcher;
pub mod logging;
pub mod queue;
pub mod registry;

pub use config::{ConfigError, PipelineConfig, QueueBackend};
pub use consumer::{CommandConsumer, DomainEventConsumer};
pub use data_pool::FileDataPoolReader;
pub use dispatcher::{DispatchError, Dispatcher, ProcessReport, Stage};
pub use logging::{LoggingCommandHandler, LoggingProjector, LoggingQueue};
pub use registry::{
    CommandHandlerRegistry, CommandHandlerRegistryBuilder, ProjectorRegistry,
    ProjectorRegistryBuilder, RegistryError,
};
