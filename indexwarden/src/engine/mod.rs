//! Search engine seam.
//!
//! Everything the lifecycle manager, population pipeline and scroll iterator
//! need from a search engine goes through [`SearchEngine`]. Each call is a
//! single request/response exchange; the caller awaits it before issuing the
//! next one.

mod memory;
mod opensearch;

pub use self::memory::{EngineCall, InMemoryEngine};
pub use self::opensearch::{OpenSearchEngine, ID_FIELD, TYPE_FIELD};

use crate::document::Document;
use crate::error::Result;
use crate::query::Query;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Structured engine acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
    /// Whether the engine reported success.
    pub ok: bool,
    /// HTTP-style status code.
    pub status: u16,
    /// Raw response payload.
    pub body: Value,
}

impl Acknowledgement {
    /// Successful acknowledgement with a body.
    pub fn ok(body: Value) -> Self {
        Self {
            ok: true,
            status: 200,
            body,
        }
    }

    /// Unsuccessful acknowledgement, e.g. a delete of a missing document.
    pub fn not_found(body: Value) -> Self {
        Self {
            ok: false,
            status: 404,
            body,
        }
    }
}

/// Snapshot of which indices exist and which aliases they carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterStatus {
    indices: BTreeMap<String, BTreeSet<String>>,
}

impl ClusterStatus {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an index and its aliases.
    pub fn insert<I, S>(&mut self, index: impl Into<String>, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indices
            .entry(index.into())
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
    }

    /// Whether a concrete index with this name exists.
    pub fn index_exists(&self, index: &str) -> bool {
        self.indices.contains_key(index)
    }

    /// Whether any index carries this alias.
    pub fn alias_exists(&self, alias: &str) -> bool {
        self.indices.values().any(|aliases| aliases.contains(alias))
    }

    /// Every index carrying this alias, in name order.
    pub fn indices_with_alias(&self, alias: &str) -> Vec<String> {
        self.indices
            .iter()
            .filter(|(_, aliases)| aliases.contains(alias))
            .map(|(index, _)| index.clone())
            .collect()
    }

    /// Aliases carried by an index.
    pub fn aliases_of(&self, index: &str) -> Vec<String> {
        self.indices
            .get(index)
            .map(|aliases| aliases.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of all indices.
    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indices.keys().map(String::as_str)
    }
}

/// One batch of a server-side cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    /// Cursor token for the next request.
    pub scroll_id: Option<String>,
    /// Total hit count reported for the whole query.
    pub total: u64,
    /// Documents in this batch.
    pub hits: Vec<Document>,
}

/// Operations a search engine client must provide.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Snapshot of indices and aliases.
    async fn status(&self) -> Result<ClusterStatus>;

    /// Create an index with a settings blob.
    async fn create_index(&self, index: &str, settings: &Value) -> Result<Acknowledgement>;

    /// Delete an index.
    async fn delete_index(&self, index: &str) -> Result<Acknowledgement>;

    /// Push the mapping of one document type.
    async fn put_mapping(
        &self,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> Result<Acknowledgement>;

    /// Current mapping of an index.
    async fn get_mapping(&self, index: &str) -> Result<Value>;

    /// Write (insert or replace) one document.
    async fn index_document(&self, index: &str, doc: &Document) -> Result<Acknowledgement>;

    /// Delete one document by type and id.
    async fn delete_document(
        &self,
        index: &str,
        type_name: &str,
        id: &str,
    ) -> Result<Acknowledgement>;

    /// Delete every document matching a query.
    async fn delete_by_query(&self, index: &str, query: &Query) -> Result<Acknowledgement>;

    /// Make written documents visible to reads.
    async fn refresh(&self, index: &str) -> Result<Acknowledgement>;

    /// Number of visible documents.
    async fn count(&self, index: &str) -> Result<u64>;

    /// Attach an alias to an index. With `replace`, the alias is detached
    /// from every other index in the same atomic request.
    async fn add_alias(&self, index: &str, alias: &str, replace: bool)
    -> Result<Acknowledgement>;

    /// Detach an alias from one index.
    async fn remove_alias(&self, index: &str, alias: &str) -> Result<Acknowledgement>;

    /// Open a cursor and return its first page.
    async fn open_scroll(
        &self,
        index: &str,
        query: &Query,
        batch_size: usize,
        ttl: &str,
    ) -> Result<ScrollPage>;

    /// Advance a cursor.
    async fn next_scroll(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage>;
}
