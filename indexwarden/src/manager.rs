//! Index lifecycle management.
//!
//! An [`IndexManager`] owns one configuration and one concrete index name. It
//! creates and deletes that index, answers existence questions from a cached
//! [`ClusterStatus`], resolves the index behind the configuration's default
//! alias, and attaches or detaches aliases.
//!
//! # Rotation
//!
//! The manager exposes the primitives of a blue/green swap but does not run
//! it. A caller builds the next generation under a distinct index name,
//! populates it, moves the alias with
//! [`add_default_alias(true)`](IndexManager::add_default_alias), and finally
//! deletes the previous generation.
//!
//! Alias resolution assumes one concrete index per alias. Alias removal does
//! not: it detaches the alias from every index holding it.

use crate::configuration::IndexConfiguration;
use crate::engine::{Acknowledgement, ClusterStatus, SearchEngine};
use crate::error::{Result, WardenError};
use crate::provider::DataProvider;
use crate::scroll::ScrollIterator;
use indexwarden_log::{debug, info, trace, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved identity of the index an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    name: String,
    alias: Option<String>,
}

impl IndexHandle {
    /// Handle to an index addressed by its own name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// Handle to the index found behind `alias`.
    pub fn by_alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Concrete index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias the handle was resolved through, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// How the handle was resolved.
    pub fn existence(&self) -> ExistenceState {
        match self.alias {
            Some(_) => ExistenceState::ExistsByAlias,
            None => ExistenceState::ExistsByName,
        }
    }
}

/// Answer of [`IndexManager::index_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistenceState {
    /// Neither the index name nor the default alias resolve.
    NotFound,
    /// An index with the manager's name exists.
    ExistsByName,
    /// No index has the manager's name, but the default alias resolves.
    ExistsByAlias,
}

impl ExistenceState {
    /// Whether anything was found.
    pub fn exists(&self) -> bool {
        !matches!(self, ExistenceState::NotFound)
    }
}

/// Cached write target of one declared document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHandle {
    /// Concrete index the type lives in.
    pub index: String,
    /// Type name.
    pub type_name: String,
}

/// Lifecycle manager for one index of one configuration.
///
/// # Example
///
/// ```rust
/// use indexwarden::prelude::*;
/// use std::sync::Arc;
///
/// # futures::executor::block_on(async {
/// let definition = IndexDefinition::new("shop")
///     .with_alias("shop_live")
///     .with_type(TypeDefinition::new("book"));
///
/// let mut manager = IndexManager::new(Arc::new(InMemoryEngine::new()), Arc::new(definition));
/// manager.create(false).await.unwrap();
/// assert_eq!(manager.index_exists().await.unwrap(), ExistenceState::ExistsByName);
/// # });
/// ```
pub struct IndexManager {
    pub(crate) engine: Arc<dyn SearchEngine>,
    pub(crate) configuration: Arc<dyn IndexConfiguration>,
    pub(crate) provider: Option<Arc<dyn DataProvider>>,
    pub(crate) index_name: String,
    status: Option<ClusterStatus>,
    types: HashMap<String, TypeHandle>,
}

impl IndexManager {
    /// Manage the index named after the configuration.
    pub fn new(engine: Arc<dyn SearchEngine>, configuration: Arc<dyn IndexConfiguration>) -> Self {
        let index_name = configuration.name().to_string();
        Self {
            engine,
            configuration,
            provider: None,
            index_name,
            status: None,
            types: HashMap::new(),
        }
    }

    /// Target a different concrete index, e.g. the next rotation generation.
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    /// Attach the provider used by population and single-document updates.
    pub fn with_provider(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the provider.
    pub fn set_provider(&mut self, provider: Arc<dyn DataProvider>) {
        self.provider = Some(provider);
    }

    /// Concrete index name this manager targets.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The configuration.
    pub fn configuration(&self) -> &dyn IndexConfiguration {
        self.configuration.as_ref()
    }

    /// The engine client.
    pub fn engine(&self) -> Arc<dyn SearchEngine> {
        self.engine.clone()
    }

    /// The provider, if one is attached.
    pub fn provider(&self) -> Option<Arc<dyn DataProvider>> {
        self.provider.clone()
    }

    // =========================================================================
    // Caches
    // =========================================================================

    /// Cluster status, loaded on first use.
    async fn status(&mut self) -> Result<&ClusterStatus> {
        let status = match self.status.take() {
            Some(status) => status,
            None => {
                debug!("Loading cluster status for index {}", self.index_name);
                self.engine.status().await?
            }
        };
        Ok(self.status.insert(status))
    }

    /// Reload the status cache if it has been loaded before.
    pub async fn refresh_status(&mut self) -> Result<()> {
        if self.status.is_some() {
            self.status = Some(self.engine.status().await?);
        }
        Ok(())
    }

    /// Drop both caches; the next query reloads the status.
    pub fn invalidate(&mut self) {
        self.status = None;
        self.types.clear();
    }

    /// Write target for `type_name` inside `index`, or `None` when the
    /// configuration does not declare that type.
    ///
    /// Declared types are looked up once per index; later rows of the same
    /// type hit the cache.
    pub(crate) fn type_handle(&mut self, index: &str, type_name: &str) -> Option<&TypeHandle> {
        let cached = self
            .types
            .get(type_name)
            .is_some_and(|handle| handle.index == index);
        if !cached {
            if !self.configuration.types().iter().any(|t| t == type_name) {
                return None;
            }
            trace!("Caching handle for type {} in index {}", type_name, index);
            self.types.insert(
                type_name.to_string(),
                TypeHandle {
                    index: index.to_string(),
                    type_name: type_name.to_string(),
                },
            );
        }
        self.types.get(type_name)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create the index with the configured settings and push every type
    /// mapping.
    ///
    /// Fails with [`WardenError::IndexAlreadyExists`] when an index with this
    /// name exists and `drop_if_exists` is false; otherwise the existing index
    /// is deleted first. Creation and mapping are separate engine calls, so a
    /// failure between them leaves an index with a partial mapping.
    pub async fn create(&mut self, drop_if_exists: bool) -> Result<IndexHandle> {
        let name = self.index_name.clone();

        if self.status().await?.index_exists(&name) {
            if !drop_if_exists {
                return Err(WardenError::IndexAlreadyExists(name));
            }
            info!("Dropping existing index {} before creation", name);
            self.engine.delete_index(&name).await?;
        }

        info!("Creating index {} for configuration {}", name, self.configuration.name());
        self.engine
            .create_index(&name, &self.configuration.settings())
            .await?;
        self.types.clear();

        self.push_mappings(&name).await?;
        self.refresh_status().await?;

        Ok(IndexHandle::by_name(name))
    }

    /// Delete the index, resolved by name or through the default alias.
    pub async fn delete(&mut self, by_alias: bool) -> Result<Acknowledgement> {
        let handle = self.target(by_alias).await?;

        info!("Deleting index {}", handle.name());
        let ack = self.engine.delete_index(handle.name()).await?;
        self.types.clear();
        self.refresh_status().await?;

        Ok(ack)
    }

    /// Whether the index exists by name, or failing that by default alias.
    pub async fn index_exists(&mut self) -> Result<ExistenceState> {
        let name = self.index_name.clone();
        let alias = self.configuration.alias().map(str::to_string);
        let status = self.status().await?;

        if status.index_exists(&name) {
            return Ok(ExistenceState::ExistsByName);
        }
        match alias {
            Some(alias) if status.alias_exists(&alias) => Ok(ExistenceState::ExistsByAlias),
            _ => Ok(ExistenceState::NotFound),
        }
    }

    /// Handle to the index by name, creating it when missing and allowed.
    pub async fn resolve(&mut self, create_if_missing: bool) -> Result<IndexHandle> {
        let name = self.index_name.clone();
        if self.status().await?.index_exists(&name) {
            return Ok(IndexHandle::by_name(name));
        }
        if !create_if_missing {
            return Err(WardenError::not_found(name));
        }
        self.create(false).await
    }

    /// Handle to the index currently behind the default alias.
    pub async fn resolve_by_alias(&mut self) -> Result<IndexHandle> {
        let alias = self.default_alias()?;
        let holders = self.status().await?.indices_with_alias(&alias);

        let Some(index) = holders.first() else {
            return Err(WardenError::alias_not_found(alias));
        };
        if holders.len() > 1 {
            warn!(
                "Alias {} points to {} indices ({:?}), using {}",
                alias,
                holders.len(),
                holders,
                index
            );
        }

        Ok(IndexHandle::by_alias(index.clone(), alias))
    }

    /// Resolve by alias or by name without creating anything.
    pub(crate) async fn target(&mut self, by_alias: bool) -> Result<IndexHandle> {
        if by_alias {
            self.resolve_by_alias().await
        } else {
            self.resolve(false).await
        }
    }

    /// Push the mapping of every declared type to the index. Returns how many
    /// types were sent.
    pub async fn set_mapping(&mut self) -> Result<usize> {
        let handle = self.resolve(false).await?;
        self.push_mappings(handle.name()).await
    }

    async fn push_mappings(&self, index: &str) -> Result<usize> {
        let mut pushed = 0;

        for type_name in self.configuration.types() {
            let properties = self.configuration.mapping_properties(&type_name);
            let mut mapping = self.configuration.mapping_params(&type_name);

            if properties.is_empty() && mapping.is_empty() {
                debug!("Type {} has no mapping, skipping", type_name);
                continue;
            }

            mapping.insert("properties".to_string(), Value::Object(properties));
            self.engine
                .put_mapping(index, &type_name, &Value::Object(mapping))
                .await?;
            pushed += 1;
        }

        Ok(pushed)
    }

    // =========================================================================
    // Aliases
    // =========================================================================

    fn default_alias(&self) -> Result<String> {
        self.configuration
            .alias()
            .map(str::to_string)
            .ok_or_else(|| WardenError::NoAliasConfigured(self.configuration.name().to_string()))
    }

    /// Attach `alias` to the index. With `replace`, the alias is moved off
    /// every other index in the same engine call.
    pub async fn add_alias(&mut self, alias: &str, replace: bool) -> Result<Acknowledgement> {
        let handle = self.resolve(false).await?;

        info!("Adding alias {} to index {}", alias, handle.name());
        let ack = self.engine.add_alias(handle.name(), alias, replace).await?;
        self.refresh_status().await?;

        Ok(ack)
    }

    /// Attach the default alias to the index.
    pub async fn add_default_alias(&mut self, replace: bool) -> Result<Acknowledgement> {
        let alias = self.default_alias()?;
        self.add_alias(&alias, replace).await
    }

    /// Detach `alias` from every index holding it. Returns how many indices
    /// were touched.
    pub async fn remove_alias(&mut self, alias: &str) -> Result<usize> {
        let holders = self.status().await?.indices_with_alias(alias);

        for index in &holders {
            info!("Removing alias {} from index {}", alias, index);
            self.engine.remove_alias(index, alias).await?;
        }
        self.refresh_status().await?;

        Ok(holders.len())
    }

    /// Detach the default alias from every index holding it.
    pub async fn remove_default_alias(&mut self) -> Result<usize> {
        let alias = self.default_alias()?;
        self.remove_alias(&alias).await
    }

    /// Whether any index carries `alias`.
    pub async fn has_alias(&mut self, alias: &str) -> Result<bool> {
        Ok(self.status().await?.alias_exists(alias))
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Number of documents visible in the resolved index.
    pub async fn document_count(&mut self, by_alias: bool) -> Result<u64> {
        let handle = self.target(by_alias).await?;
        self.engine.count(handle.name()).await
    }

    /// Scroll iterator over the resolved index.
    pub async fn iterator(&mut self, by_alias: bool) -> Result<ScrollIterator> {
        let handle = self.target(by_alias).await?;
        Ok(ScrollIterator::new(self.engine.clone(), handle))
    }
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("configuration", &self.configuration.name())
            .field("index_name", &self.index_name)
            .field("has_provider", &self.provider.is_some())
            .field("status_loaded", &self.status.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{IndexDefinition, TypeDefinition};
    use crate::engine::InMemoryEngine;
    use serde_json::json;

    fn manager(engine: &InMemoryEngine) -> IndexManager {
        let definition = IndexDefinition::new("shop")
            .with_alias("shop_live")
            .with_type(
                TypeDefinition::new("book")
                    .properties(json!({ "name": { "type": "text" } }).as_object().unwrap().clone()),
            )
            .with_type(TypeDefinition::new("dvd"));
        IndexManager::new(Arc::new(engine.clone()), Arc::new(definition))
    }

    #[tokio::test]
    async fn test_status_is_loaded_once() {
        let engine = InMemoryEngine::new();
        let mut manager = manager(&engine);

        manager.index_exists().await.unwrap();
        manager.has_alias("shop_live").await.unwrap();
        assert_eq!(engine.call_count("status"), 1);

        manager.invalidate();
        manager.index_exists().await.unwrap();
        assert_eq!(engine.call_count("status"), 2);
    }

    #[tokio::test]
    async fn test_refresh_status_without_cache_is_a_no_op() {
        let engine = InMemoryEngine::new();
        let mut manager = manager(&engine);
        manager.refresh_status().await.unwrap();
        assert!(!engine.was_called("status"));
    }

    #[tokio::test]
    async fn test_empty_mappings_are_not_sent() {
        let engine = InMemoryEngine::new();
        let mut manager = manager(&engine);
        manager.create(false).await.unwrap();

        assert_eq!(engine.calls_to("put_mapping"), vec![vec!["shop", "book"]]);
        assert_eq!(manager.set_mapping().await.unwrap(), 1);
    }

    #[test]
    fn test_type_handles_follow_the_index() {
        let engine = InMemoryEngine::new();
        let mut manager = manager(&engine);

        let handle = manager.type_handle("shop_v1", "book").unwrap();
        assert_eq!(handle.index, "shop_v1");
        assert_eq!(handle.type_name, "book");
        assert_eq!(manager.type_handle("shop_v2", "book").unwrap().index, "shop_v2");
    }

    #[test]
    fn test_undeclared_types_get_no_handle() {
        let engine = InMemoryEngine::new();
        let mut manager = manager(&engine);

        assert!(manager.type_handle("shop", "vinyl").is_none());
        assert!(manager.type_handle("shop", "dvd").is_some());
        assert_eq!(manager.types.len(), 1);

        manager.invalidate();
        assert!(manager.types.is_empty());
    }

    #[tokio::test]
    async fn test_alias_operations_need_a_default_alias() {
        let engine = InMemoryEngine::new();
        let definition = IndexDefinition::new("logs").with_type(TypeDefinition::new("line"));
        let mut manager = IndexManager::new(Arc::new(engine), Arc::new(definition));

        assert!(matches!(
            manager.resolve_by_alias().await,
            Err(WardenError::NoAliasConfigured(name)) if name == "logs"
        ));
        assert!(matches!(
            manager.remove_default_alias().await,
            Err(WardenError::NoAliasConfigured(_))
        ));
    }

    #[test]
    fn test_handle_existence() {
        assert_eq!(IndexHandle::by_name("a").existence(), ExistenceState::ExistsByName);
        assert_eq!(
            IndexHandle::by_alias("a", "b").existence(),
            ExistenceState::ExistsByAlias
        );
        assert!(!ExistenceState::NotFound.exists());
    }
}
