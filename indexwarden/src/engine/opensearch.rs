//! OpenSearch engine adapter.
//!
//! OpenSearch has a single mapping per index, so logical document types are
//! folded into it: every document is stored under the engine id
//! `"{type}#{id}"` and carries its type and id in two keyword fields
//! ([`TYPE_FIELD`], [`ID_FIELD`]). Those fields are added on write, stripped on
//! read, and used to render type and id queries.

use super::{Acknowledgement, ClusterStatus, ScrollPage, SearchEngine};
use crate::config::ClientConfig;
use crate::document::{Document, Payload};
use crate::error::{Result, WardenError};
use crate::query::Query;
use async_trait::async_trait;
use indexwarden_log::{debug, info};
use opensearch::{
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{
        IndicesCreateParts, IndicesDeleteAliasParts, IndicesDeleteParts, IndicesGetAliasParts,
        IndicesGetMappingParts, IndicesPutMappingParts, IndicesRefreshParts,
    },
    CountParts, DeleteByQueryParts, DeleteParts, IndexParts, OpenSearch, ScrollParts,
    SearchParts,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Keyword field holding the logical document type.
pub const TYPE_FIELD: &str = "warden_type";

/// Keyword field holding the logical document id.
pub const ID_FIELD: &str = "warden_id";

/// [`SearchEngine`] backed by an OpenSearch cluster.
#[derive(Clone)]
pub struct OpenSearchEngine {
    client: Arc<OpenSearch>,
    config: Arc<ClientConfig>,
}

impl OpenSearchEngine {
    /// Build a single-node transport from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        info!("Initializing OpenSearch engine for: {:?}", config.urls);

        let url = config
            .urls
            .first()
            .ok_or_else(|| WardenError::Config("No URLs provided".to_string()))?;

        let url = opensearch::http::Url::parse(url)
            .map_err(|e| WardenError::Config(format!("Invalid URL: {}", e)))?;

        let conn_pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(conn_pool).timeout(config.request_timeout);

        if config.disable_proxy {
            builder = builder.disable_proxy();
        }

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.auth(opensearch::auth::Credentials::Basic(
                user.clone(),
                pass.clone(),
            ));
        }

        let transport = builder
            .build()
            .map_err(|e| WardenError::Connection(e.to_string()))?;

        debug!("OpenSearch engine initialized");

        Ok(Self {
            client: Arc::new(OpenSearch::new(transport)),
            config: Arc::new(config),
        })
    }

    /// Connect using [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get the underlying OpenSearch client.
    pub fn inner(&self) -> &OpenSearch {
        &self.client
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Engine id of a logical document.
    pub fn engine_id(type_name: &str, id: &str) -> String {
        format!("{}#{}", type_name, id)
    }

    async fn alias_holders(&self, alias: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let ack = acknowledge(response).await?;
        Ok(ack
            .body
            .as_object()
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for OpenSearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSearchEngine")
            .field("urls", &self.config.urls)
            .finish()
    }
}

/// Read a response body and fail on non-success statuses.
async fn acknowledge(response: Response) -> Result<Acknowledgement> {
    let status = response.status_code();
    let text = response.text().await?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    if !status.is_success() {
        return Err(WardenError::Engine {
            status: status.as_u16(),
            reason: error_reason(&body),
        });
    }

    Ok(Acknowledgement {
        ok: true,
        status: status.as_u16(),
        body,
    })
}

fn error_reason(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("reason").or(Some(e)))
        .and_then(|r| r.as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

fn meta_properties() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(TYPE_FIELD.to_string(), json!({ "type": "keyword" }));
    properties.insert(ID_FIELD.to_string(), json!({ "type": "keyword" }));
    properties
}

/// Render an engine-neutral query to OpenSearch query DSL.
pub(crate) fn render_query(query: &Query) -> Value {
    match query {
        Query::MatchAll => json!({ "match_all": {} }),
        Query::Type(ty) => json!({ "term": { TYPE_FIELD: ty } }),
        Query::Ids(ids) => json!({ "terms": { ID_FIELD: ids } }),
        Query::Term { field, value } => json!({ "term": { field: value } }),
        Query::Terms { field, values } => json!({ "terms": { field: values } }),
        Query::Bool(b) => {
            let render = |clauses: &[Query]| clauses.iter().map(render_query).collect::<Vec<_>>();
            json!({
                "bool": {
                    "must": render(&b.must),
                    "filter": render(&b.filter),
                    "must_not": render(&b.must_not),
                }
            })
        }
        Query::Raw(raw) => raw.clone(),
    }
}

/// Body of an index creation request: meta fields always mapped, settings
/// only when there are any.
fn create_body(settings: &Value) -> Value {
    let mut body = json!({ "mappings": { "properties": meta_properties() } });
    if settings.as_object().is_some_and(|s| !s.is_empty()) {
        body["settings"] = settings.clone();
    }
    body
}

/// Type mapping merged with the meta fields.
fn mapping_body(mapping: &Value) -> Value {
    let mut body = match mapping {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let properties = body
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(properties) = properties {
        properties.extend(meta_properties());
    }
    Value::Object(body)
}

fn document_source(doc: &Document) -> Value {
    let mut source = doc.payload.clone();
    source.insert(TYPE_FIELD.to_string(), json!(doc.type_name));
    source.insert(ID_FIELD.to_string(), json!(doc.id));
    Value::Object(source)
}

/// `_aliases` actions moving `alias` onto `index`. `holders` are the indices
/// to detach it from first; `index` itself is never detached.
fn alias_actions(index: &str, alias: &str, holders: &[String]) -> Value {
    let mut actions: Vec<Value> = holders
        .iter()
        .filter(|holder| *holder != index)
        .map(|holder| json!({ "remove": { "index": holder, "alias": alias } }))
        .collect();
    actions.push(json!({ "add": { "index": index, "alias": alias } }));
    json!({ "actions": actions })
}

fn query_body(query: &Query) -> Value {
    json!({ "query": render_query(query) })
}

fn scroll_body(scroll_id: &str, ttl: &str) -> Value {
    json!({ "scroll": ttl, "scroll_id": scroll_id })
}

fn hit_to_document(hit: &Value) -> Option<Document> {
    let mut source: Payload = hit.get("_source")?.as_object()?.clone();

    let type_name = match source.remove(TYPE_FIELD) {
        Some(Value::String(ty)) => ty,
        _ => "_doc".to_string(),
    };
    let id = match source.remove(ID_FIELD) {
        Some(Value::String(id)) => id,
        _ => hit.get("_id")?.as_str()?.to_string(),
    };

    Some(Document::new(id, type_name, source))
}

fn scroll_page(body: &Value) -> ScrollPage {
    let hits = &body["hits"];
    let total = hits["total"]
        .get("value")
        .and_then(Value::as_u64)
        .or_else(|| hits["total"].as_u64())
        .unwrap_or(0);

    ScrollPage {
        scroll_id: body["_scroll_id"].as_str().map(str::to_string),
        total,
        hits: hits["hits"]
            .as_array()
            .map(|hits| hits.iter().filter_map(hit_to_document).collect())
            .unwrap_or_default(),
    }
}

#[async_trait]
impl SearchEngine for OpenSearchEngine {
    async fn status(&self) -> Result<ClusterStatus> {
        debug!("Loading cluster status");

        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::None)
            .send()
            .await?;
        let ack = acknowledge(response).await?;

        let mut status = ClusterStatus::new();
        if let Some(indices) = ack.body.as_object() {
            for (index, entry) in indices {
                let aliases = entry["aliases"]
                    .as_object()
                    .map(|aliases| aliases.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default();
                status.insert(index.clone(), aliases);
            }
        }
        Ok(status)
    }

    async fn create_index(&self, index: &str, settings: &Value) -> Result<Acknowledgement> {
        info!("Creating index: {}", index);

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(create_body(settings))
            .send()
            .await?;

        if response.status_code() == StatusCode::BAD_REQUEST {
            let body: Value = response.json().await?;
            if body["error"]["type"].as_str() == Some("resource_already_exists_exception") {
                return Err(WardenError::IndexAlreadyExists(index.to_string()));
            }
            return Err(WardenError::Engine {
                status: StatusCode::BAD_REQUEST.as_u16(),
                reason: error_reason(&body),
            });
        }

        acknowledge(response).await
    }

    async fn delete_index(&self, index: &str) -> Result<Acknowledgement> {
        info!("Deleting index: {}", index);

        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Err(WardenError::not_found(index));
        }

        acknowledge(response).await
    }

    async fn put_mapping(
        &self,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> Result<Acknowledgement> {
        debug!("Updating mapping of type {} in index {}", type_name, index);

        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping_body(mapping))
            .send()
            .await?;

        acknowledge(response).await
    }

    async fn get_mapping(&self, index: &str) -> Result<Value> {
        let response = self
            .client
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Err(WardenError::not_found(index));
        }

        let ack = acknowledge(response).await?;
        Ok(ack
            .body
            .as_object()
            .and_then(|indices| indices.values().next())
            .map(|entry| entry["mappings"].clone())
            .unwrap_or(Value::Null))
    }

    async fn index_document(&self, index: &str, doc: &Document) -> Result<Acknowledgement> {
        let id = Self::engine_id(&doc.type_name, &doc.id);
        debug!("Indexing document {} in index {}", id, index);

        let response = self
            .client
            .index(IndexParts::IndexId(index, &id))
            .body(document_source(doc))
            .send()
            .await?;

        acknowledge(response).await
    }

    async fn delete_document(
        &self,
        index: &str,
        type_name: &str,
        id: &str,
    ) -> Result<Acknowledgement> {
        let id = Self::engine_id(type_name, id);
        debug!("Deleting document {} from index {}", id, index);

        let response = self
            .client
            .delete(DeleteParts::IndexId(index, &id))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            let body: Value = response.json().await?;
            return Ok(Acknowledgement::not_found(body));
        }

        acknowledge(response).await
    }

    async fn delete_by_query(&self, index: &str, query: &Query) -> Result<Acknowledgement> {
        debug!("Deleting documents by query in index {}", index);

        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[index]))
            .body(query_body(query))
            .send()
            .await?;

        acknowledge(response).await
    }

    async fn refresh(&self, index: &str) -> Result<Acknowledgement> {
        debug!("Refreshing index {}", index);

        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await?;

        acknowledge(response).await
    }

    async fn count(&self, index: &str) -> Result<u64> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Err(WardenError::not_found(index));
        }

        let ack = acknowledge(response).await?;
        Ok(ack.body["count"].as_u64().unwrap_or(0))
    }

    async fn add_alias(
        &self,
        index: &str,
        alias: &str,
        replace: bool,
    ) -> Result<Acknowledgement> {
        info!("Adding alias {} to index {} (replace: {})", alias, index, replace);

        let holders = if replace {
            self.alias_holders(alias).await?
        } else {
            Vec::new()
        };

        let response = self
            .client
            .indices()
            .update_aliases()
            .body(alias_actions(index, alias, &holders))
            .send()
            .await?;

        acknowledge(response).await
    }

    async fn remove_alias(&self, index: &str, alias: &str) -> Result<Acknowledgement> {
        info!("Removing alias {} from index {}", alias, index);

        let response = self
            .client
            .indices()
            .delete_alias(IndicesDeleteAliasParts::IndexName(&[index], &[alias]))
            .send()
            .await?;

        acknowledge(response).await
    }

    async fn open_scroll(
        &self,
        index: &str,
        query: &Query,
        batch_size: usize,
        ttl: &str,
    ) -> Result<ScrollPage> {
        debug!("Opening scroll on index {} (batch {}, ttl {})", index, batch_size, ttl);

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .scroll(ttl)
            .size(batch_size as i64)
            .body(query_body(query))
            .send()
            .await?;

        let ack = acknowledge(response).await?;
        Ok(scroll_page(&ack.body))
    }

    async fn next_scroll(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(scroll_body(scroll_id, ttl))
            .send()
            .await?;

        let ack = acknowledge(response).await?;
        Ok(scroll_page(&ack.body))
    }
}
