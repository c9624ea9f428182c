//! Blue/green rotation of a shop catalogue.
//!
//! Builds the next index generation, fills it, swaps the live alias onto it
//! and drops the previous generation.
//!
//! ```text
//! INDEXWARDEN_URL=http://localhost:9200 cargo run --example blue_green -- shop_v2 shop_v1
//! ```
//!
//! Pass `--memory` as the first argument to run against the in-memory engine.

use indexwarden::prelude::*;
use indexwarden::{IndexSettings, Mapping, MappingField};
use indexwarden_log::info;
use serde_json::json;
use std::env;
use std::ops::ControlFlow;
use std::sync::Arc;

fn catalogue() -> IndexDefinition {
    IndexDefinition::new("shop")
        .with_alias("shop_live")
        .with_settings(IndexSettings::new().shards(1).replicas(0))
        .with_type(
            TypeDefinition::new("book").mapping(
                Mapping::new()
                    .field("name", MappingField::text())
                    .field("author", MappingField::keyword()),
            ),
        )
        .with_type(
            TypeDefinition::new("dvd").mapping(
                Mapping::new()
                    .field("name", MappingField::text())
                    .field("director", MappingField::keyword()),
            ),
        )
}

fn rows() -> JsonRowProvider {
    JsonRowProvider::new(vec![
        json!({ "type": "book", "id": 1, "name": "Fight Club", "author": "Chuck Palahniuk" }),
        json!({ "type": "book", "id": 2, "name": "The Beach", "author": "Alex Garland" }),
        json!({ "type": "dvd", "id": 3, "name": "The Beach", "director": "Danny Boyle" }),
        json!({ "type": "dvd", "id": 4, "name": "TRON: Legacy", "director": "Joseph Kosinski" }),
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let engine: Arc<dyn SearchEngine> = if args.first().map(String::as_str) == Some("--memory") {
        args.remove(0);
        Arc::new(InMemoryEngine::new())
    } else {
        Arc::new(OpenSearchEngine::from_env()?)
    };

    let next = args.first().cloned().unwrap_or_else(|| "shop_v2".to_string());
    let previous = args.get(1).cloned();

    let mut registry = IndexRegistry::new(engine);
    registry.add_configuration_with_provider(catalogue(), rows());

    let manager = registry.manager("shop", Some(&next))?;
    let mut progress = |i: usize, total: usize| info!("Indexing {}/{}", i + 1, total);
    manager
        .populate(PopulateOptions::new(), Some(&mut progress))
        .await?;

    manager.add_default_alias(true).await?;
    let live = manager.resolve_by_alias().await?;
    let count = manager.document_count(true).await?;
    info!("Alias shop_live now serves {} ({} documents)", live.name(), count);

    let iterator = manager.iterator(true).await?.batch_size(2);
    iterator
        .iterate(&Query::of_type("dvd"), |doc, i, total| {
            info!("[{}/{}] {} {:?}", i + 1, total, doc.id, doc.get("name"));
            ControlFlow::Continue(())
        })
        .await?;

    if let Some(previous) = previous.filter(|p| *p != next) {
        let old = registry.manager("shop", Some(&previous))?;
        if old.index_exists().await? == ExistenceState::ExistsByName {
            old.delete(false).await?;
            info!("Dropped previous generation {}", previous);
        }
    }

    Ok(())
}
