//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two instances built
/// from the same inputs are interchangeable. `DataVersion` is the canonical example
/// in this workspace; messages (`DomainEvent`, `Command`) follow the same rule.
///
/// To "modify" a value object, construct a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
