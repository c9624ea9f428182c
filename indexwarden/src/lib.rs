//! Search index lifecycle management.
//!
//! This crate is the operational plane around a search engine:
//! - Index creation from a configuration (settings plus per-type mappings)
//! - Existence checks and resolution by name or by default alias
//! - Alias attach/detach for blue/green rotation
//! - Bulk population from a caller-supplied data provider
//! - Single-document update and delete
//! - Scroll iteration over arbitrarily large result sets
//!
//! Every operation awaits its engine calls one after another. There is no
//! internal parallelism, batching or retrying.
//!
//! # Example
//!
//! ```rust,no_run
//! use indexwarden::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let engine = Arc::new(OpenSearchEngine::from_env()?);
//!     let definition = IndexDefinition::from_file("shop.toml")?;
//!     let provider = JsonRowProvider::new(vec![
//!         json!({ "type": "book", "id": 1, "name": "Fight Club" }),
//!         json!({ "type": "dvd", "id": 3, "name": "The Beach" }),
//!     ]);
//!
//!     // Build the next generation and swap the live alias onto it
//!     let mut next = IndexManager::new(engine, Arc::new(definition))
//!         .with_index_name("shop_v2")
//!         .with_provider(Arc::new(provider));
//!
//!     next.populate(PopulateOptions::new(), None).await?;
//!     next.add_default_alias(true).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod configuration;
mod document;
mod error;
mod manager;
mod populate;
mod provider;
mod query;
mod registry;
mod schema;
mod scroll;

pub mod engine;

pub use config::{ClientConfig, ENV_PREFIX};
pub use configuration::{IndexConfiguration, IndexDefinition, TypeDefinition};
pub use document::{Document, Payload, Row};
pub use engine::{
    Acknowledgement, ClusterStatus, InMemoryEngine, OpenSearchEngine, ScrollPage, SearchEngine,
};
pub use error::{Result, WardenError};
pub use manager::{ExistenceState, IndexHandle, IndexManager, TypeHandle};
pub use populate::{PopulateOptions, Progress};
pub use provider::{transform_keyed_row, DataProvider, JsonRowProvider, ProgressHook, RowSet};
pub use query::{BoolQuery, Query};
pub use registry::IndexRegistry;
pub use schema::{FieldType, IndexSettings, Mapping, MappingField};
pub use scroll::{ScrollIterator, ScrollOptions, DEFAULT_BATCH_SIZE, DEFAULT_TTL};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        DataProvider, Document, ExistenceState, InMemoryEngine, IndexConfiguration,
        IndexDefinition, IndexHandle, IndexManager, IndexRegistry, JsonRowProvider,
        OpenSearchEngine, PopulateOptions, Query, Result, RowSet, ScrollIterator,
        SearchEngine, TypeDefinition, WardenError,
    };
}
