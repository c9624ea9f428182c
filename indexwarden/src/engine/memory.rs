//! In-memory engine for tests and local tooling.

use super::{Acknowledgement, ClusterStatus, ScrollPage, SearchEngine};
use crate::document::Document;
use crate::error::{Result, WardenError};
use crate::query::Query;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type DocKey = (String, String);

/// One recorded engine call: method name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    /// Trait method name, e.g. `"create_index"`.
    pub method: String,
    /// Arguments rendered as strings.
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct IndexState {
    settings: Value,
    mappings: Map<String, Value>,
    aliases: BTreeSet<String>,
    written: BTreeMap<DocKey, Document>,
    visible: BTreeMap<DocKey, Document>,
}

#[derive(Debug)]
struct Cursor {
    remaining: VecDeque<Document>,
    batch_size: usize,
    total: u64,
}

#[derive(Debug, Default)]
struct State {
    indices: BTreeMap<String, IndexState>,
    cursors: HashMap<String, Cursor>,
    next_cursor: u64,
    calls: Vec<EngineCall>,
    failing: HashSet<String>,
}

impl State {
    /// Concrete index behind a name or a single-holder alias.
    fn resolve(&self, name: &str) -> Option<String> {
        if self.indices.contains_key(name) {
            return Some(name.to_string());
        }
        let mut holders = self
            .indices
            .iter()
            .filter(|(_, state)| state.aliases.contains(name));
        match (holders.next(), holders.next()) {
            (Some((index, _)), None) => Some(index.clone()),
            _ => None,
        }
    }

    fn index_mut(&mut self, name: &str) -> Result<&mut IndexState> {
        let index = self
            .resolve(name)
            .ok_or_else(|| WardenError::not_found(name))?;
        self.indices
            .get_mut(&index)
            .ok_or_else(|| WardenError::not_found(name))
    }

    fn index(&self, name: &str) -> Result<&IndexState> {
        let index = self
            .resolve(name)
            .ok_or_else(|| WardenError::not_found(name))?;
        self.indices
            .get(&index)
            .ok_or_else(|| WardenError::not_found(name))
    }

    fn next_page(&mut self, cursor_id: &str) -> Result<ScrollPage> {
        let cursor = self.cursors.get_mut(cursor_id).ok_or_else(|| WardenError::Engine {
            status: 404,
            reason: format!("No search context found for id [{}]", cursor_id),
        })?;

        let take = cursor.batch_size.min(cursor.remaining.len());
        Ok(ScrollPage {
            scroll_id: Some(cursor_id.to_string()),
            total: cursor.total,
            hits: cursor.remaining.drain(..take).collect(),
        })
    }
}

/// [`SearchEngine`] holding everything in process memory.
///
/// Mirrors the engine behaviour the lifecycle manager relies on: writes only
/// become visible to counts and scrolls after a refresh, aliases can be held
/// by several indices, and scroll cursors page through a snapshot taken when
/// they are opened. Every call is journaled for assertions.
///
/// # Example
///
/// ```rust
/// use indexwarden::engine::{InMemoryEngine, SearchEngine};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let engine = InMemoryEngine::new();
/// engine.create_index("shop_v1", &json!({})).await.unwrap();
/// assert!(engine.was_called("create_index"));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryEngine {
    state: Arc<Mutex<State>>,
}

impl InMemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and fail it if the method was marked failing.
    fn enter(&self, method: &str, args: &[&str]) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(EngineCall {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        if state.failing.contains(method) {
            return Err(WardenError::Engine {
                status: 500,
                reason: format!("{} failed", method),
            });
        }
        Ok(state)
    }

    /// Make every subsequent call to `method` fail with an engine error.
    pub fn fail_on(&self, method: &str) {
        self.lock().failing.insert(method.to_string());
    }

    /// Stop failing `method`.
    pub fn recover(&self, method: &str) {
        self.lock().failing.remove(method);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Names of the recorded calls, in order.
    pub fn call_names(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.method.clone()).collect()
    }

    /// Arguments of every call to `method`.
    pub fn calls_to(&self, method: &str) -> Vec<Vec<String>> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .map(|c| c.args.clone())
            .collect()
    }

    /// Number of calls to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.method == method).count()
    }

    /// Whether `method` was called at least once.
    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Written documents, visible or not.
    pub fn written_documents(&self, index: &str) -> Vec<Document> {
        self.lock()
            .index(index)
            .map(|state| state.written.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Settings an index was created with.
    pub fn settings_of(&self, index: &str) -> Option<Value> {
        self.lock().index(index).ok().map(|state| state.settings.clone())
    }

    /// Number of scroll cursors still open.
    pub fn open_cursors(&self) -> usize {
        self.lock().cursors.len()
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    async fn status(&self) -> Result<ClusterStatus> {
        let state = self.enter("status", &[])?;
        let mut status = ClusterStatus::new();
        for (name, index) in &state.indices {
            status.insert(name.clone(), index.aliases.iter().cloned());
        }
        Ok(status)
    }

    async fn create_index(&self, index: &str, settings: &Value) -> Result<Acknowledgement> {
        let mut state = self.enter("create_index", &[index])?;
        if state.indices.contains_key(index) {
            return Err(WardenError::IndexAlreadyExists(index.to_string()));
        }
        state.indices.insert(
            index.to_string(),
            IndexState {
                settings: settings.clone(),
                ..IndexState::default()
            },
        );
        Ok(Acknowledgement::ok(json!({ "acknowledged": true, "index": index })))
    }

    async fn delete_index(&self, index: &str) -> Result<Acknowledgement> {
        let mut state = self.enter("delete_index", &[index])?;
        state
            .indices
            .remove(index)
            .ok_or_else(|| WardenError::not_found(index))?;
        Ok(Acknowledgement::ok(json!({ "acknowledged": true })))
    }

    async fn put_mapping(
        &self,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> Result<Acknowledgement> {
        let mut state = self.enter("put_mapping", &[index, type_name])?;
        state
            .index_mut(index)?
            .mappings
            .insert(type_name.to_string(), mapping.clone());
        Ok(Acknowledgement::ok(json!({ "acknowledged": true })))
    }

    async fn get_mapping(&self, index: &str) -> Result<Value> {
        let state = self.enter("get_mapping", &[index])?;
        Ok(Value::Object(state.index(index)?.mappings.clone()))
    }

    async fn index_document(&self, index: &str, doc: &Document) -> Result<Acknowledgement> {
        let mut state = self.enter("index_document", &[index, &doc.type_name, &doc.id])?;
        let key = (doc.type_name.clone(), doc.id.clone());
        let replaced = state
            .index_mut(index)?
            .written
            .insert(key, doc.clone())
            .is_some();
        let result = if replaced { "updated" } else { "created" };
        Ok(Acknowledgement::ok(json!({ "_id": doc.id, "result": result })))
    }

    async fn delete_document(
        &self,
        index: &str,
        type_name: &str,
        id: &str,
    ) -> Result<Acknowledgement> {
        let mut state = self.enter("delete_document", &[index, type_name, id])?;
        let key = (type_name.to_string(), id.to_string());
        match state.index_mut(index)?.written.remove(&key) {
            Some(_) => Ok(Acknowledgement::ok(json!({ "_id": id, "result": "deleted" }))),
            None => Ok(Acknowledgement::not_found(
                json!({ "_id": id, "result": "not_found" }),
            )),
        }
    }

    async fn delete_by_query(&self, index: &str, query: &Query) -> Result<Acknowledgement> {
        let mut state = self.enter("delete_by_query", &[index])?;
        let target = state.index_mut(index)?;

        let mut doomed = Vec::new();
        for (key, doc) in &target.written {
            if query.matches(doc)? {
                doomed.push(key.clone());
            }
        }
        for key in &doomed {
            target.written.remove(key);
        }
        Ok(Acknowledgement::ok(json!({ "deleted": doomed.len() })))
    }

    async fn refresh(&self, index: &str) -> Result<Acknowledgement> {
        let mut state = self.enter("refresh", &[index])?;
        let target = state.index_mut(index)?;
        target.visible = target.written.clone();
        Ok(Acknowledgement::ok(json!({ "_shards": { "failed": 0 } })))
    }

    async fn count(&self, index: &str) -> Result<u64> {
        let state = self.enter("count", &[index])?;
        Ok(state.index(index)?.visible.len() as u64)
    }

    async fn add_alias(
        &self,
        index: &str,
        alias: &str,
        replace: bool,
    ) -> Result<Acknowledgement> {
        let replace_arg = if replace { "replace" } else { "keep" };
        let mut state = self.enter("add_alias", &[index, alias, replace_arg])?;
        if !state.indices.contains_key(index) {
            return Err(WardenError::not_found(index));
        }
        if replace {
            for other in state.indices.values_mut() {
                other.aliases.remove(alias);
            }
        }
        state.index_mut(index)?.aliases.insert(alias.to_string());
        Ok(Acknowledgement::ok(json!({ "acknowledged": true })))
    }

    async fn remove_alias(&self, index: &str, alias: &str) -> Result<Acknowledgement> {
        let mut state = self.enter("remove_alias", &[index, alias])?;
        let target = state
            .indices
            .get_mut(index)
            .ok_or_else(|| WardenError::not_found(index))?;
        if !target.aliases.remove(alias) {
            return Err(WardenError::Engine {
                status: 404,
                reason: format!("aliases [{}] missing", alias),
            });
        }
        Ok(Acknowledgement::ok(json!({ "acknowledged": true })))
    }

    async fn open_scroll(
        &self,
        index: &str,
        query: &Query,
        batch_size: usize,
        ttl: &str,
    ) -> Result<ScrollPage> {
        let size = batch_size.to_string();
        let mut state = self.enter("open_scroll", &[index, &size, ttl])?;
        if batch_size == 0 {
            return Err(WardenError::Engine {
                status: 400,
                reason: "scroll size must be positive".to_string(),
            });
        }

        let mut remaining = VecDeque::new();
        for doc in state.index(index)?.visible.values() {
            if query.matches(doc)? {
                remaining.push_back(doc.clone());
            }
        }

        state.next_cursor += 1;
        let cursor_id = format!("cursor-{}", state.next_cursor);
        let total = remaining.len() as u64;
        state.cursors.insert(
            cursor_id.clone(),
            Cursor {
                remaining,
                batch_size,
                total,
            },
        );
        state.next_page(&cursor_id)
    }

    async fn next_scroll(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage> {
        let mut state = self.enter("next_scroll", &[scroll_id, ttl])?;
        let page = state.next_page(scroll_id)?;
        if page.hits.is_empty() {
            state.cursors.remove(scroll_id);
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(type_name: &str, id: &str) -> Document {
        Document::from_value(id, type_name, json!({ "name": id })).unwrap()
    }

    #[tokio::test]
    async fn test_writes_visible_after_refresh() {
        let engine = InMemoryEngine::new();
        engine.create_index("shop_v1", &json!({})).await.unwrap();
        engine.index_document("shop_v1", &doc("book", "1")).await.unwrap();

        assert_eq!(engine.count("shop_v1").await.unwrap(), 0);
        engine.refresh("shop_v1").await.unwrap();
        assert_eq!(engine.count("shop_v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_id_in_two_types_are_distinct() {
        let engine = InMemoryEngine::new();
        engine.create_index("shop_v1", &json!({})).await.unwrap();
        engine.index_document("shop_v1", &doc("book", "1")).await.unwrap();
        engine.index_document("shop_v1", &doc("dvd", "1")).await.unwrap();
        assert_eq!(engine.written_documents("shop_v1").len(), 2);

        let ack = engine.delete_by_query("shop_v1", &Query::id("1")).await.unwrap();
        assert_eq!(ack.body["deleted"], 2);
    }

    #[tokio::test]
    async fn test_replace_alias_moves_it() {
        let engine = InMemoryEngine::new();
        engine.create_index("shop_v1", &json!({})).await.unwrap();
        engine.create_index("shop_v2", &json!({})).await.unwrap();
        engine.add_alias("shop_v1", "shop", false).await.unwrap();
        engine.add_alias("shop_v2", "shop", false).await.unwrap();
        assert_eq!(
            engine.status().await.unwrap().indices_with_alias("shop").len(),
            2
        );

        engine.add_alias("shop_v2", "shop", true).await.unwrap();
        let status = engine.status().await.unwrap();
        assert_eq!(status.indices_with_alias("shop"), vec!["shop_v2"]);
    }

    #[tokio::test]
    async fn test_scroll_pages_until_empty() {
        let engine = InMemoryEngine::new();
        engine.create_index("shop_v1", &json!({})).await.unwrap();
        for id in ["1", "2", "3"] {
            engine.index_document("shop_v1", &doc("book", id)).await.unwrap();
        }
        engine.refresh("shop_v1").await.unwrap();

        let first = engine
            .open_scroll("shop_v1", &Query::match_all(), 2, "1m")
            .await
            .unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.hits.len(), 2);

        let cursor = first.scroll_id.unwrap();
        assert_eq!(engine.next_scroll(&cursor, "1m").await.unwrap().hits.len(), 1);
        assert!(engine.next_scroll(&cursor, "1m").await.unwrap().hits.is_empty());
        assert_eq!(engine.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let engine = InMemoryEngine::new();
        engine.fail_on("status");
        assert!(matches!(
            engine.status().await,
            Err(WardenError::Engine { status: 500, .. })
        ));
        assert_eq!(engine.call_names(), vec!["status"]);

        engine.recover("status");
        assert!(engine.status().await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_scroll_size_is_refused() {
        let engine = InMemoryEngine::new();
        engine.create_index("logs", &json!({})).await.unwrap();

        assert!(matches!(
            engine.open_scroll("logs", &Query::match_all(), 0, "1m").await,
            Err(WardenError::Engine { status: 400, .. })
        ));
        assert_eq!(engine.open_cursors(), 0);
    }
}
