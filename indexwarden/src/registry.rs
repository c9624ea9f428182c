//! Registry of named configurations and the managers built from them.

use crate::configuration::IndexConfiguration;
use crate::engine::SearchEngine;
use crate::error::{Result, WardenError};
use crate::manager::IndexManager;
use crate::provider::DataProvider;
use indexwarden_log::debug;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

struct Registration {
    configuration: Arc<dyn IndexConfiguration>,
    provider: Option<Arc<dyn DataProvider>>,
}

/// Holds configurations by name and hands out one [`IndexManager`] per
/// concrete index name.
///
/// ```rust
/// use indexwarden::prelude::*;
/// use std::sync::Arc;
///
/// let mut registry = IndexRegistry::new(Arc::new(InMemoryEngine::new()));
/// registry.add_configuration(IndexDefinition::new("shop").with_type(TypeDefinition::new("book")));
///
/// let manager = registry.manager("shop", Some("shop_v2")).unwrap();
/// assert_eq!(manager.index_name(), "shop_v2");
/// assert!(registry.manager("blog", None).is_err());
/// ```
pub struct IndexRegistry {
    engine: Arc<dyn SearchEngine>,
    registrations: HashMap<String, Registration>,
    managers: HashMap<String, IndexManager>,
}

impl IndexRegistry {
    /// Create an empty registry over one engine.
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            registrations: HashMap::new(),
            managers: HashMap::new(),
        }
    }

    /// Register a configuration under its own name, replacing any earlier one.
    pub fn add_configuration(&mut self, configuration: impl IndexConfiguration + 'static) {
        self.register(Arc::new(configuration), None);
    }

    /// Register a configuration together with its data provider.
    pub fn add_configuration_with_provider(
        &mut self,
        configuration: impl IndexConfiguration + 'static,
        provider: impl DataProvider + 'static,
    ) {
        self.register(Arc::new(configuration), Some(Arc::new(provider)));
    }

    /// Register shared handles.
    pub fn register(
        &mut self,
        configuration: Arc<dyn IndexConfiguration>,
        provider: Option<Arc<dyn DataProvider>>,
    ) {
        let name = configuration.name().to_string();
        debug!("Registering configuration {}", name);
        self.managers
            .retain(|_, manager| manager.configuration().name() != name);
        self.registrations.insert(
            name,
            Registration {
                configuration,
                provider,
            },
        );
    }

    /// Registered configuration names, sorted.
    pub fn configuration_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registrations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a configuration.
    pub fn configuration(&self, name: &str) -> Result<Arc<dyn IndexConfiguration>> {
        self.registrations
            .get(name)
            .map(|r| r.configuration.clone())
            .ok_or_else(|| WardenError::UnknownConfiguration(name.to_string()))
    }

    /// Manager for `index_name` (the configuration name when `None`), built on
    /// first request and reused afterwards.
    ///
    /// An index name already managed under a different configuration is
    /// rejected.
    pub fn manager(
        &mut self,
        configuration_name: &str,
        index_name: Option<&str>,
    ) -> Result<&mut IndexManager> {
        let registration = self
            .registrations
            .get(configuration_name)
            .ok_or_else(|| WardenError::UnknownConfiguration(configuration_name.to_string()))?;
        let index_name = index_name.unwrap_or(configuration_name).to_string();

        match self.managers.entry(index_name) {
            Entry::Occupied(entry) => {
                let owner = entry.get().configuration().name();
                if owner != configuration_name {
                    return Err(WardenError::Config(format!(
                        "Index \"{}\" is already managed by configuration \"{}\"",
                        entry.key(),
                        owner
                    )));
                }
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let mut manager =
                    IndexManager::new(self.engine.clone(), registration.configuration.clone())
                        .with_index_name(entry.key().clone());
                if let Some(provider) = &registration.provider {
                    manager.set_provider(provider.clone());
                }
                Ok(entry.insert(manager))
            }
        }
    }
}

impl std::fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRegistry")
            .field("configurations", &self.configuration_names())
            .field("managers", &self.managers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{IndexDefinition, TypeDefinition};
    use crate::engine::InMemoryEngine;
    use crate::provider::JsonRowProvider;

    fn registry() -> IndexRegistry {
        let mut registry = IndexRegistry::new(Arc::new(InMemoryEngine::new()));
        registry.add_configuration_with_provider(
            IndexDefinition::new("shop").with_type(TypeDefinition::new("book")),
            JsonRowProvider::default(),
        );
        registry.add_configuration(IndexDefinition::new("blog"));
        registry
    }

    #[test]
    fn test_unknown_configuration() {
        let mut registry = registry();
        assert!(matches!(
            registry.manager("wiki", None),
            Err(WardenError::UnknownConfiguration(name)) if name == "wiki"
        ));
        assert!(registry.configuration("wiki").is_err());
        assert_eq!(registry.configuration_names(), vec!["blog", "shop"]);
    }

    #[test]
    fn test_managers_are_cached_per_index_name() {
        let mut registry = registry();
        let manager = registry.manager("shop", None).unwrap();
        assert_eq!(manager.index_name(), "shop");
        assert!(manager.provider().is_some());
        manager.invalidate();

        registry.manager("shop", Some("shop_v2")).unwrap();
        registry.manager("shop", Some("shop_v2")).unwrap();
        assert_eq!(registry.managers.len(), 2);
    }

    #[test]
    fn test_index_name_bound_to_one_configuration() {
        let mut registry = registry();
        registry.manager("shop", Some("shared")).unwrap();
        assert!(matches!(
            registry.manager("blog", Some("shared")),
            Err(WardenError::Config(_))
        ));
    }
}
