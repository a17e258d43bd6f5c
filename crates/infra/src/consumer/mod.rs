//! Batch drainers for the two queues.
//!
//! Consumers are invoked on demand, run a single snapshot drain, and return a
//! [`DrainSummary`](catalog_events::DrainSummary). They are sequential and hold no
//! state between invocations.

pub mod command;
pub mod domain_event;

pub use command::CommandConsumer;
pub use domain_event::DomainEventConsumer;
