use serde::{Deserialize, Serialize};

use catalog_core::{DataVersion, ValueObject};

/// Event type raised when a caller asks for an artifact (e.g. a template) to be
/// regenerated.
pub const ARTIFACT_UPDATE_REQUESTED: &str = "artifact-update-requested";

/// An immutable record of something that happened to the imported data.
///
/// Domain events are:
/// - **immutable** (treat them as facts; there are no setters)
/// - **stamped** with exactly one [`DataVersion`], fixed at creation
/// - **structural**: two events with the same fields are the same event; the
///   transport id lives on the queue envelope, not here
///
/// `target` optionally narrows delivery to the projector registered under that
/// code. Events without a target fan out to every projector for `event_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    /// Projection source data; opaque to the pipeline and possibly empty.
    payload: String,
    data_version: DataVersion,
}

impl DomainEvent {
    pub fn new(
        event_type: impl Into<String>,
        payload: impl Into<String>,
        data_version: DataVersion,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
            payload: payload.into(),
            data_version,
        }
    }

    /// Build the `artifact-update-requested` event aimed at one projector code.
    pub fn artifact_update_requested(
        code: impl Into<String>,
        payload: impl Into<String>,
        data_version: DataVersion,
    ) -> Self {
        Self::new(ARTIFACT_UPDATE_REQUESTED, payload, data_version).targeting(code)
    }

    /// Return a copy of this event aimed at a single projector code.
    pub fn targeting(mut self, code: impl Into<String>) -> Self {
        self.target = Some(code.into());
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn data_version(&self) -> &DataVersion {
        &self.data_version
    }
}

impl ValueObject for DomainEvent {}
