//! Bulk population and single-document maintenance.
//!
//! Documents are written one engine call at a time, in provider order, and a
//! single index refresh follows the full pass. A failure part-way through
//! leaves the documents written so far in place.

use crate::document::Document;
use crate::engine::Acknowledgement;
use crate::error::{Result, WardenError};
use crate::manager::{IndexHandle, IndexManager};
use crate::provider::DataProvider;
use crate::query::Query;
use futures::StreamExt;
use indexwarden_log::{debug, info};
use std::sync::Arc;

/// Caller progress callback, invoked with `(index, total)` before each row.
pub type Progress<'a> = &'a mut (dyn FnMut(usize, usize) + Send);

/// Options of [`IndexManager::populate`].
#[derive(Debug, Clone)]
pub struct PopulateOptions {
    /// Load only this type. `None` loads every type the provider returns.
    pub type_name: Option<String>,
    /// Delete the target index before loading.
    pub delete_if_exists: bool,
    /// Target the index behind the default alias instead of the index name.
    pub by_alias: bool,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        Self {
            type_name: None,
            delete_if_exists: true,
            by_alias: false,
        }
    }
}

impl PopulateOptions {
    /// Full reload of every type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single type.
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Keep the existing index and add to it.
    pub fn keep_existing(mut self) -> Self {
        self.delete_if_exists = false;
        self
    }

    /// Target the index behind the default alias.
    pub fn by_alias(mut self) -> Self {
        self.by_alias = true;
        self
    }
}

impl IndexManager {
    fn require_provider(&self) -> Result<Arc<dyn DataProvider>> {
        self.provider.clone().ok_or_else(|| {
            WardenError::Config(format!(
                "No data provider attached to index \"{}\"",
                self.index_name
            ))
        })
    }

    /// Transform a row and check it is writable: non-empty id and type, and a
    /// type the configuration declares.
    fn transform(
        &mut self,
        provider: &dyn DataProvider,
        index: &str,
        row: serde_json::Value,
        type_name: Option<&str>,
    ) -> Result<Document> {
        let invalid = |reason: String| WardenError::ProviderTransformInvalid {
            index: index.to_string(),
            reason,
        };

        let doc = provider
            .transform_row(row, type_name)
            .ok_or_else(|| invalid("row transform produced no document".to_string()))?;

        if let Some(reason) = doc.malformation() {
            return Err(invalid(reason));
        }
        if self.type_handle(index, &doc.type_name).is_none() {
            return Err(invalid(format!(
                "document {} has undeclared type \"{}\"",
                doc.id, doc.type_name
            )));
        }

        Ok(doc)
    }

    /// Population target: the alias holder when asked and present, otherwise
    /// the index by name, created if missing.
    async fn population_target(&mut self, by_alias: bool) -> Result<IndexHandle> {
        if by_alias {
            match self.resolve_by_alias().await {
                Ok(handle) => return Ok(handle),
                Err(WardenError::IndexNotFound { .. }) => {
                    debug!("Alias of {} does not resolve, populating by name", self.index_name);
                }
                Err(e) => return Err(e),
            }
        }
        self.resolve(true).await
    }

    /// Load documents from the attached provider.
    ///
    /// In order: delete the target when `delete_if_exists` and it resolves;
    /// resolve it again, creating it by name if missing; pull rows, total and
    /// the provider hook; write every transformed row; refresh once.
    ///
    /// `progress` and the provider's iteration hook are both called with
    /// `(i, total)` before row `i` is transformed. `total` is the provider's
    /// reported total, or the row count when only that is known.
    pub async fn populate(
        &mut self,
        options: PopulateOptions,
        mut progress: Option<Progress<'_>>,
    ) -> Result<IndexHandle> {
        let provider = self.require_provider()?;
        let type_name = options.type_name.as_deref();

        if options.delete_if_exists {
            let target = if options.by_alias {
                self.resolve_by_alias().await
            } else {
                self.resolve(false).await
            };
            match target {
                Ok(_) => {
                    self.delete(options.by_alias).await?;
                }
                Err(WardenError::IndexNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let handle = self.population_target(options.by_alias).await?;
        let index = handle.name().to_string();

        let rows = provider.data(type_name).await?;
        let reported_total = provider.total(type_name).await;
        let mut provider_hook = provider.iteration_hook();

        let rows = rows.ok_or_else(|| WardenError::NoProviderData(index.clone()))?;
        let (mut rows, row_count) = rows.into_rows(&index).await?;
        let total = reported_total.or(row_count).unwrap_or(0);

        info!(
            "Populating index {} (type: {}, total: {})",
            index,
            type_name.unwrap_or("*"),
            total
        );

        let mut i = 0;
        while let Some(row) = rows.next().await {
            if let Some(progress) = progress.as_mut() {
                progress(i, total);
            }
            if let Some(hook) = provider_hook.as_mut() {
                hook(i, total);
            }

            let doc = self.transform(provider.as_ref(), &index, row, type_name)?;
            self.engine.index_document(&index, &doc).await?;

            i += 1;
        }

        self.engine.refresh(&index).await?;
        info!("Populated index {} with {} documents", index, i);

        Ok(handle)
    }

    /// Re-read one document from the provider and write it.
    ///
    /// Every call refreshes the status cache and the index; use
    /// [`populate`](IndexManager::populate) for bulk work.
    pub async fn update_document(
        &mut self,
        id: &str,
        type_name: Option<&str>,
        by_alias: bool,
    ) -> Result<Acknowledgement> {
        let provider = self.require_provider()?;
        let handle = self.target(by_alias).await?;
        let index = handle.name();

        let row = provider
            .document_data(id, type_name)
            .await?
            .ok_or_else(|| WardenError::NoProviderData(index.to_string()))?;
        let doc = self.transform(provider.as_ref(), index, row, type_name)?;

        debug!("Updating document {}/{} in index {}", doc.type_name, doc.id, index);
        let ack = self.engine.index_document(index, &doc).await?;

        self.refresh_status().await?;
        self.engine.refresh(index).await?;

        Ok(ack)
    }

    /// Delete one document.
    ///
    /// With a type, only that type's document is removed. Without one, every
    /// document with this id is removed, whatever its type.
    pub async fn delete_document(
        &mut self,
        id: &str,
        type_name: Option<&str>,
        by_alias: bool,
    ) -> Result<Acknowledgement> {
        let handle = self.target(by_alias).await?;
        let index = handle.name();

        let ack = match type_name {
            Some(type_name) => {
                debug!("Deleting document {}/{} from index {}", type_name, id, index);
                self.engine.delete_document(index, type_name, id).await?
            }
            None => {
                debug!("Deleting document {} of any type from index {}", id, index);
                self.engine.delete_by_query(index, &Query::id(id)).await?
            }
        };

        self.refresh_status().await?;
        self.engine.refresh(index).await?;

        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_builders() {
        let options = PopulateOptions::for_type("dvd").keep_existing().by_alias();
        assert_eq!(options.type_name.as_deref(), Some("dvd"));
        assert!(!options.delete_if_exists);
        assert!(options.by_alias);

        let defaults = PopulateOptions::new();
        assert!(defaults.delete_if_exists);
        assert!(defaults.type_name.is_none());
    }
}
