//! Messages, handler seams and the queue contract of the import pipeline.
//!
//! This crate is mechanics only: it knows what a domain event and a command look
//! like, how a queue drains, and what a projector or command handler must expose.
//! Registries, consumers and durable backends live in `catalog-infra`.

pub mod command;
pub mod data_pool;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_queue;
pub mod projector;
pub mod queue;
pub mod summary;

pub use command::Command;
pub use data_pool::{DataPoolError, DataPoolReader, InMemoryDataPool};
pub use envelope::Envelope;
pub use event::{ARTIFACT_UPDATE_REQUESTED, DomainEvent};
pub use handler::{CommandError, CommandHandler};
pub use in_memory_queue::InMemoryQueue;
pub use projector::{ProjectionError, Projector};
pub use queue::{HandlerError, MessageQueue, QueueError};
pub use summary::{DrainSummary, HandlingError, HandlingFailure, MessageFailure};
