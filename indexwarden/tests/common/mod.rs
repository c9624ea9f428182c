//! Shared fixtures: a two-type shop catalogue on the in-memory engine.

#![allow(dead_code)]

use async_trait::async_trait;
use indexwarden::prelude::*;
use indexwarden::{IndexSettings, Mapping, MappingField};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const SHOP: &str = "shop";
pub const SHOP_ALIAS: &str = "shop_live";

pub fn shop_definition() -> IndexDefinition {
    IndexDefinition::new(SHOP)
        .with_alias(SHOP_ALIAS)
        .with_settings(IndexSettings::new().shards(1).replicas(0))
        .with_type(
            TypeDefinition::new("book").mapping(
                Mapping::new()
                    .field(
                        "name",
                        MappingField::text().sub_field("raw", MappingField::keyword()),
                    )
                    .field("author", MappingField::text()),
            ),
        )
        .with_type(
            TypeDefinition::new("dvd")
                .mapping(
                    Mapping::new()
                        .field("name", MappingField::text())
                        .field("director", MappingField::text()),
                )
                .param("dynamic", json!("strict")),
        )
}

pub fn shop_rows() -> Vec<Value> {
    vec![
        json!({ "type": "book", "id": 1, "name": "Fight Club", "author": "Chuck Palahniuk" }),
        json!({ "type": "book", "id": 2, "name": "The Beach", "author": "Alex Garland" }),
        json!({ "type": "dvd", "id": 3, "name": "The Beach", "director": "Danny Boyle" }),
        json!({ "type": "dvd", "id": 4, "name": "TRON: Legacy", "director": "Joseph Kosinski" }),
    ]
}

pub fn shop_provider() -> JsonRowProvider {
    JsonRowProvider::new(shop_rows())
}

/// Manager for `index_name` of the shop configuration, with the shop provider.
pub fn shop_manager(engine: &InMemoryEngine, index_name: &str) -> IndexManager {
    IndexManager::new(Arc::new(engine.clone()), Arc::new(shop_definition()))
        .with_index_name(index_name)
        .with_provider(Arc::new(shop_provider()))
}

pub fn shop() -> (InMemoryEngine, IndexManager) {
    let engine = InMemoryEngine::new();
    let manager = shop_manager(&engine, SHOP);
    (engine, manager)
}

type RowSource = Box<dyn Fn() -> Option<RowSet> + Send + Sync>;

/// Provider with a scripted row set, an optional total and a recording hook.
pub struct ScriptedProvider {
    rows: RowSource,
    total: Option<usize>,
    pub hook_calls: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl ScriptedProvider {
    pub fn new(rows: impl Fn() -> Option<RowSet> + Send + Sync + 'static) -> Self {
        Self {
            rows: Box::new(rows),
            total: None,
            hook_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn data(&self, _type_name: Option<&str>) -> indexwarden::Result<Option<RowSet>> {
        Ok((self.rows)())
    }

    async fn total(&self, _type_name: Option<&str>) -> Option<usize> {
        self.total
    }

    fn iteration_hook(&self) -> Option<indexwarden::ProgressHook> {
        let calls = self.hook_calls.clone();
        Some(Box::new(move |i, total| {
            calls.lock().unwrap().push((i, total));
        }))
    }
}

/// Provider that only implements the required method.
pub struct BareProvider;

#[async_trait]
impl DataProvider for BareProvider {
    async fn data(&self, type_name: Option<&str>) -> indexwarden::Result<Option<RowSet>> {
        let rows: Vec<Value> = shop_rows()
            .into_iter()
            .filter(|row| type_name.is_none_or(|ty| row["type"] == ty))
            .collect();
        Ok(Some(rows.into()))
    }
}
