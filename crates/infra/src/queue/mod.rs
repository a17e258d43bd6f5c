//! Durable queue backends.
//!
//! The queue contract and the in-memory implementation live in `catalog-events`.
//! This module provides the storage-backed implementations.

pub mod sqlite;

#[cfg(feature = "redis")]
pub mod redis;

pub use sqlite::SqliteQueue;

#[cfg(feature = "redis")]
pub use self::redis::RedisListQueue;
