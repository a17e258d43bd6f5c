//! `catalog-core`: value types shared by the import pipeline.
//!
//! This crate contains **pure** primitives (no IO, no queues, no logging).

pub mod data_version;
pub mod error;
pub mod id;
pub mod value_object;

pub use data_version::DataVersion;
pub use error::{DomainError, DomainResult};
pub use id::MessageId;
pub use value_object::ValueObject;
