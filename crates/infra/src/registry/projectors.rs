use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use catalog_events::Projector;

use super::RegistryError;

/// Maps stable projector codes to projectors, and event types to the projectors
/// that handle them.
///
/// - Codes are unique; [`registered_codes`](Self::registered_codes) is sorted and
///   identical across calls.
/// - Fan-out order for an event type is registration order.
#[derive(Clone, Default)]
pub struct ProjectorRegistry {
    by_code: BTreeMap<String, Arc<dyn Projector>>,
    by_event_type: HashMap<String, Vec<Arc<dyn Projector>>>,
}

impl ProjectorRegistry {
    pub fn builder() -> ProjectorRegistryBuilder {
        ProjectorRegistryBuilder::default()
    }

    /// Every registered code, in sorted order.
    pub fn registered_codes(&self) -> BTreeSet<String> {
        self.by_code.keys().cloned().collect()
    }

    pub fn is_registered(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn resolve(&self, code: &str) -> Result<Arc<dyn Projector>, RegistryError> {
        self.by_code
            .get(code)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProjectorCode(code.to_string()))
    }

    /// Projectors registered for `event_type`; empty when there are none.
    pub fn projectors_for(&self, event_type: &str) -> &[Arc<dyn Projector>] {
        self.by_event_type
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl core::fmt::Debug for ProjectorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProjectorRegistry")
            .field("codes", &self.by_code.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
pub struct ProjectorRegistryBuilder {
    registry: ProjectorRegistry,
}

impl ProjectorRegistryBuilder {
    /// Add a projector. Fails if its code is empty or already taken.
    pub fn register(mut self, projector: impl Projector + 'static) -> Result<Self, RegistryError> {
        self.insert(Arc::new(projector))?;
        Ok(self)
    }

    /// Add an already shared projector (e.g. one wrapped in a decorator).
    pub fn register_shared(mut self, projector: Arc<dyn Projector>) -> Result<Self, RegistryError> {
        self.insert(projector)?;
        Ok(self)
    }

    fn insert(&mut self, projector: Arc<dyn Projector>) -> Result<(), RegistryError> {
        let code = projector.code().to_string();
        if code.is_empty() {
            return Err(RegistryError::EmptyProjectorCode);
        }
        if self.registry.by_code.contains_key(&code) {
            return Err(RegistryError::DuplicateProjectorCode(code));
        }

        self.registry
            .by_event_type
            .entry(projector.event_type().to_string())
            .or_default()
            .push(projector.clone());
        self.registry.by_code.insert(code, projector);
        Ok(())
    }

    pub fn build(self) -> ProjectorRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use catalog_events::{Command, DomainEvent, ProjectionError};

    use super::*;

    struct Named(&'static str, &'static str);

    impl Projector for Named {
        fn code(&self) -> &str {
            self.0
        }

        fn event_type(&self) -> &str {
            self.1
        }

        fn project(&self, _event: &DomainEvent) -> Result<Vec<Command>, ProjectionError> {
            Ok(vec![])
        }
    }

    fn registry() -> ProjectorRegistry {
        ProjectorRegistry::builder()
            .register(Named("header", "artifact-update-requested"))
            .unwrap()
            .register(Named("footer", "artifact-update-requested"))
            .unwrap()
            .register(Named("search-index", "product-imported"))
            .unwrap()
            .build()
    }

    #[test]
    fn listing_codes_is_sorted_and_stable() {
        let registry = registry();
        let first = registry.registered_codes();
        let second = registry.registered_codes();
        assert_eq!(first, second);
        assert_eq!(
            first.into_iter().collect::<Vec<_>>(),
            vec!["footer", "header", "search-index"]
        );
    }

    #[test]
    fn resolve_finds_registered_codes_only() {
        let registry = registry();
        assert_eq!(registry.resolve("header").unwrap().code(), "header");
        assert_eq!(
            registry.resolve("does-not-exist").err(),
            Some(RegistryError::UnknownProjectorCode("does-not-exist".into()))
        );
    }

    #[test]
    fn projectors_for_fans_out_in_registration_order() {
        let registry = registry();
        let codes: Vec<_> = registry
            .projectors_for("artifact-update-requested")
            .iter()
            .map(|p| p.code().to_string())
            .collect();
        assert_eq!(codes, vec!["header", "footer"]);
        assert!(registry.projectors_for("stock-updated").is_empty());
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let err = ProjectorRegistry::builder()
            .register(Named("header", "a"))
            .unwrap()
            .register(Named("header", "b"))
            .err();
        assert_eq!(err, Some(RegistryError::DuplicateProjectorCode("header".into())));
    }

    #[test]
    fn empty_codes_are_rejected() {
        let err = ProjectorRegistry::builder().register(Named("", "a")).err();
        assert_eq!(err, Some(RegistryError::EmptyProjectorCode));
    }
}
