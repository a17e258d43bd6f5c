//! Data version stamps.
//!
//! Every domain event is stamped with the version of the imported data snapshot it
//! was produced against. The token itself is owned by the data pool; this crate only
//! guarantees it is non-empty, printable, and totally ordered.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// An opaque, totally ordered snapshot token.
///
/// Equality is by the exact underlying string. Ordering:
/// - tokens made only of ASCII digits compare numerically (`"9" < "10"`), with the
///   raw string as tie-breaker so that `"01"` and `"1"` stay distinct;
/// - all numeric tokens sort before non-numeric ones;
/// - non-numeric tokens (e.g. timestamp-derived `"2024-05-01T10:00:00"`) compare
///   lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataVersion(String);

impl DataVersion {
    /// Build a version from the token handed out by the data pool.
    ///
    /// Fails with [`DomainError::InvalidVersion`] for empty tokens, tokens with
    /// surrounding whitespace, and tokens containing control characters.
    pub fn from_version_string(s: impl Into<String>) -> DomainResult<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(DomainError::invalid_version("version string is empty"));
        }
        if s.trim() != s {
            return Err(DomainError::invalid_version(format!(
                "version string {s:?} has surrounding whitespace"
            )));
        }
        if s.chars().any(char::is_control) {
            return Err(DomainError::invalid_version(format!(
                "version string {s:?} contains control characters"
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn numeric_digits(&self) -> Option<&str> {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            let trimmed = self.0.trim_start_matches('0');
            Some(if trimmed.is_empty() { "0" } else { trimmed })
        } else {
            None
        }
    }
}

impl ValueObject for DataVersion {}

impl Ord for DataVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_digits(), other.numeric_digits()) {
            (Some(a), Some(b)) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.cmp(b))
                .then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for DataVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DataVersion {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_version_string(s)
    }
}

impl TryFrom<String> for DataVersion {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_version_string(value)
    }
}

impl From<DataVersion> for String {
    fn from(value: DataVersion) -> Self {
        value.0
    }
}

impl AsRef<str> for DataVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
