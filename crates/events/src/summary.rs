//! Per-drain reporting.
//!
//! Failures while handling an already-durable message never unwind a drain. They
//! are collected here, next to the counters, and handed back to the caller.

use core::fmt;

use serde::Serialize;
use thiserror::Error;

use catalog_core::MessageId;

use crate::{CommandError, ProjectionError, QueueError};

/// Why a single message could not be handled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlingError {
    /// The event targets a projector code that no projector for its type carries.
    #[error("unknown projector code \"{code}\" for event type \"{event_type}\"")]
    UnknownProjectorCode { code: String, event_type: String },

    #[error("no handler registered for command type \"{command_type}\"")]
    NoHandlerForCommand { command_type: String },

    #[error("projector \"{code}\" failed: {error}")]
    ProjectorExecution {
        code: String,
        #[source]
        error: ProjectionError,
    },

    #[error("handler for \"{command_type}\" failed: {error}")]
    CommandExecution {
        command_type: String,
        #[source]
        error: CommandError,
    },

    /// A projector succeeded but the command queue rejected one of its
    /// commands. `dropped` counts that command and every one after it.
    #[error("{dropped} command(s) from projector \"{code}\" were not enqueued: {error}")]
    FollowUpEnqueue {
        code: String,
        dropped: usize,
        #[source]
        error: QueueError,
    },

    /// The stored message could not be decoded; it has been removed from the queue.
    #[error("message could not be decoded: {0}")]
    Decode(String),
}

/// All errors raised while handling one message.
///
/// A domain event fans out to several projectors, so one message can fail in more
/// than one place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandlingFailure {
    errors: Vec<HandlingError>,
}

impl HandlingFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: HandlingError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[HandlingError] {
        &self.errors
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), HandlingFailure> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<HandlingError> for HandlingFailure {
    fn from(value: HandlingError) -> Self {
        Self {
            errors: vec![value],
        }
    }
}

impl fmt::Display for HandlingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HandlingFailure {}

/// A message that was consumed but not handled successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFailure {
    /// `None` when the backend could not even decode the envelope.
    pub message_id: Option<MessageId>,
    pub failure: HandlingFailure,
}

impl MessageFailure {
    pub fn new(message_id: Option<MessageId>, failure: impl Into<HandlingFailure>) -> Self {
        Self {
            message_id,
            failure: failure.into(),
        }
    }
}

/// Outcome of one `consume_all` / `process_all` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    /// Messages popped and handed to a handler (or found undecodable).
    pub attempted: usize,
    pub succeeded: usize,
    #[serde(skip)]
    pub failures: Vec<MessageFailure>,
    /// Projector or command-handler invocations across the pass.
    pub invocations: usize,
    /// Commands appended to the command queue by projectors during the pass.
    pub follow_ups: usize,
}

impl DrainSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self, failure: MessageFailure) {
        self.attempted += 1;
        self.failures.push(failure);
    }
}
