mod common;

use common::*;
use futures::stream;
use indexwarden::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_full_then_partial_population_counts() {
    let (_engine, mut manager) = shop();

    manager.populate(PopulateOptions::new(), None).await.unwrap();
    assert_eq!(manager.document_count(false).await.unwrap(), 4);

    manager
        .populate(PopulateOptions::for_type("book"), None)
        .await
        .unwrap();
    assert_eq!(manager.document_count(false).await.unwrap(), 2);

    manager
        .populate(PopulateOptions::for_type("dvd").keep_existing(), None)
        .await
        .unwrap();
    assert_eq!(manager.document_count(false).await.unwrap(), 4);
}

#[tokio::test]
async fn test_progress_called_once_per_row() {
    let (_engine, mut manager) = shop();

    let mut seen = Vec::new();
    let mut progress = |i: usize, total: usize| seen.push((i, total));
    manager
        .populate(PopulateOptions::new(), Some(&mut progress))
        .await
        .unwrap();

    assert_eq!(seen, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
}

#[tokio::test]
async fn test_provider_hook_runs_alongside_progress() {
    let (_engine, manager) = shop();
    let provider = ScriptedProvider::new(|| Some(shop_rows().into())).with_total(4);
    let hook_calls = provider.hook_calls.clone();
    let mut manager = manager.with_provider(Arc::new(provider));

    let mut seen = Vec::new();
    let mut progress = |i: usize, total: usize| seen.push((i, total));
    manager
        .populate(PopulateOptions::new(), Some(&mut progress))
        .await
        .unwrap();

    assert_eq!(*hook_calls.lock().unwrap(), seen);
    assert_eq!(seen.len(), 4);
}

#[tokio::test]
async fn test_one_write_per_row_and_a_single_refresh() {
    let (engine, mut manager) = shop();
    manager.populate(PopulateOptions::new(), None).await.unwrap();

    assert_eq!(engine.call_count("index_document"), 4);
    assert_eq!(engine.call_count("refresh"), 1);

    let writes: Vec<String> = engine
        .calls_to("index_document")
        .into_iter()
        .map(|args| args[2].clone())
        .collect();
    assert_eq!(writes, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_population_drops_existing_index_first() {
    let (engine, mut manager) = shop();
    manager.populate(PopulateOptions::new(), None).await.unwrap();
    engine.clear_calls();

    manager.populate(PopulateOptions::new(), None).await.unwrap();

    let names = engine.call_names();
    let deleted = names.iter().position(|n| n == "delete_index").unwrap();
    let created = names.iter().position(|n| n == "create_index").unwrap();
    assert!(deleted < created);
}

#[tokio::test]
async fn test_status_failure_during_reload_is_an_error() {
    let (engine, mut manager) = shop();
    manager.populate(PopulateOptions::new(), None).await.unwrap();
    manager.invalidate();
    engine.clear_calls();

    engine.fail_on("status");
    let err = manager
        .populate(PopulateOptions::for_type("book"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Engine { status: 500, .. }));
    assert!(!engine.was_called("delete_index"));
    assert!(!engine.was_called("index_document"));

    engine.recover("status");
    manager
        .populate(PopulateOptions::for_type("book"), None)
        .await
        .unwrap();
    assert_eq!(manager.document_count(false).await.unwrap(), 2);
}

#[tokio::test]
async fn test_reload_by_alias_without_alias_configured() {
    let engine = InMemoryEngine::new();
    let definition = IndexDefinition::new("logs").with_type(TypeDefinition::new("line"));
    let mut manager = IndexManager::new(Arc::new(engine.clone()), Arc::new(definition))
        .with_provider(Arc::new(JsonRowProvider::new(vec![
            json!({ "type": "line", "id": 1, "text": "boot" }),
        ])));

    assert!(matches!(
        manager.populate(PopulateOptions::new().by_alias(), None).await,
        Err(WardenError::NoAliasConfigured(_))
    ));
    assert!(!engine.was_called("create_index"));
}

#[tokio::test]
async fn test_stream_rows_use_provider_total() {
    let (_engine, manager) = shop();
    let provider =
        ScriptedProvider::new(|| Some(RowSet::stream(stream::iter(shop_rows())))).with_total(4);
    let mut manager = manager.with_provider(Arc::new(provider));

    let mut totals = Vec::new();
    let mut progress = |_: usize, total: usize| totals.push(total);
    manager
        .populate(PopulateOptions::new(), Some(&mut progress))
        .await
        .unwrap();

    assert_eq!(totals, vec![4; 4]);
    assert_eq!(manager.document_count(false).await.unwrap(), 4);
}

#[tokio::test]
async fn test_required_only_provider() {
    let (_engine, manager) = shop();
    let mut manager = manager.with_provider(Arc::new(BareProvider));

    let mut totals = Vec::new();
    let mut progress = |_: usize, total: usize| totals.push(total);
    manager
        .populate(PopulateOptions::for_type("dvd"), Some(&mut progress))
        .await
        .unwrap();

    assert_eq!(totals, vec![2, 2]);
    assert!(matches!(
        manager.update_document("3", None, false).await,
        Err(WardenError::NoProviderData(_))
    ));
}

#[tokio::test]
async fn test_empty_provider_data() {
    for rows in [
        ScriptedProvider::new(|| None),
        ScriptedProvider::new(|| Some(RowSet::Rows(Vec::new()))),
        ScriptedProvider::new(|| Some(RowSet::stream(stream::empty()))),
    ] {
        let (engine, manager) = shop();
        let mut manager = manager.with_provider(Arc::new(rows));

        let err = manager.populate(PopulateOptions::new(), None).await.unwrap_err();
        assert!(matches!(err, WardenError::NoProviderData(ref index) if index == SHOP));
        assert!(!engine.was_called("index_document"));
    }
}

#[tokio::test]
async fn test_non_sequence_provider_data() {
    let (_engine, manager) = shop();
    let provider = ScriptedProvider::new(|| Some(RowSet::Raw(json!({ "id": 1 }))));
    let mut manager = manager.with_provider(Arc::new(provider));

    assert!(matches!(
        manager.populate(PopulateOptions::new(), None).await,
        Err(WardenError::ProviderIteratorInvalid(_))
    ));
}

#[tokio::test]
async fn test_invalid_transform_stops_population() {
    let (engine, manager) = shop();
    let provider = ScriptedProvider::new(|| {
        Some(
            vec![
                json!({ "type": "book", "id": 1, "name": "Fight Club" }),
                json!({ "type": "book", "id": 2, "name": "The Beach" }),
                json!({ "type": "book", "name": "no id" }),
                json!({ "type": "dvd", "id": 4, "name": "TRON: Legacy" }),
            ]
            .into(),
        )
    });
    let mut manager = manager.with_provider(Arc::new(provider));

    let err = manager.populate(PopulateOptions::new(), None).await.unwrap_err();
    assert!(matches!(err, WardenError::ProviderTransformInvalid { .. }));

    // written so far stays, unrefreshed
    assert_eq!(engine.written_documents(SHOP).len(), 2);
    assert!(!engine.was_called("refresh"));
}

#[tokio::test]
async fn test_undeclared_type_is_rejected() {
    let (_engine, manager) = shop();
    let provider = ScriptedProvider::new(|| {
        Some(vec![json!({ "type": "vinyl", "id": 9, "name": "Nevermind" })].into())
    });
    let mut manager = manager.with_provider(Arc::new(provider));

    let err = manager.populate(PopulateOptions::new(), None).await.unwrap_err();
    assert!(err.to_string().contains("vinyl"));
}

#[tokio::test]
async fn test_population_without_provider() {
    let engine = InMemoryEngine::new();
    let mut manager = IndexManager::new(Arc::new(engine), Arc::new(shop_definition()));

    assert!(matches!(
        manager.populate(PopulateOptions::new(), None).await,
        Err(WardenError::Config(_))
    ));
}

#[tokio::test]
async fn test_population_by_alias_writes_to_alias_holder() {
    let engine = InMemoryEngine::new();
    let mut generation = shop_manager(&engine, "shop_v1");
    generation.create(false).await.unwrap();
    generation.add_default_alias(true).await.unwrap();

    let mut manager = shop_manager(&engine, SHOP);
    let handle = manager
        .populate(PopulateOptions::for_type("dvd").keep_existing().by_alias(), None)
        .await
        .unwrap();

    assert_eq!(handle.name(), "shop_v1");
    assert_eq!(manager.document_count(true).await.unwrap(), 2);
    assert!(!engine.status().await.unwrap().index_exists(SHOP));
}

#[tokio::test]
async fn test_update_document_rewrites_from_provider() {
    let (engine, mut manager) = shop();
    manager.populate(PopulateOptions::new(), None).await.unwrap();

    let mut rows = shop_rows();
    rows[3]["name"] = json!("TRON: Legacy (Director's Cut)");
    manager.set_provider(Arc::new(JsonRowProvider::new(rows)));

    let ack = manager.update_document("4", Some("dvd"), false).await.unwrap();
    assert!(ack.ok);

    let updated = engine
        .written_documents(SHOP)
        .into_iter()
        .find(|doc| doc.id == "4")
        .unwrap();
    assert_eq!(updated.get("name"), Some(&json!("TRON: Legacy (Director's Cut)")));
    assert_eq!(manager.document_count(false).await.unwrap(), 4);
    assert_eq!(engine.call_count("refresh"), 2);
}

#[tokio::test]
async fn test_update_document_requires_an_index() {
    let (engine, mut manager) = shop();
    assert!(matches!(
        manager.update_document("1", None, false).await,
        Err(WardenError::IndexNotFound { .. })
    ));
    assert!(!engine.was_called("create_index"));
}

fn shared_id_rows() -> Vec<serde_json::Value> {
    vec![
        json!({ "type": "book", "id": 7, "name": "Fight Club" }),
        json!({ "type": "dvd", "id": 7, "name": "Fight Club" }),
        json!({ "type": "dvd", "id": 8, "name": "The Beach" }),
    ]
}

#[tokio::test]
async fn test_delete_document_without_type_removes_all_types() {
    let (_engine, manager) = shop();
    let mut manager = manager.with_provider(Arc::new(JsonRowProvider::new(shared_id_rows())));
    manager.populate(PopulateOptions::new(), None).await.unwrap();

    let ack = manager.delete_document("7", None, false).await.unwrap();
    assert_eq!(ack.body["deleted"], 2);
    assert_eq!(manager.document_count(false).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_document_with_type_keeps_other_types() {
    let (engine, manager) = shop();
    let mut manager = manager.with_provider(Arc::new(JsonRowProvider::new(shared_id_rows())));
    manager.populate(PopulateOptions::new(), None).await.unwrap();

    let ack = manager.delete_document("7", Some("dvd"), false).await.unwrap();
    assert!(ack.ok);
    assert_eq!(manager.document_count(false).await.unwrap(), 2);

    let remaining: Vec<(String, String)> = engine
        .written_documents(SHOP)
        .into_iter()
        .map(|doc| (doc.type_name, doc.id))
        .collect();
    assert!(remaining.contains(&("book".to_string(), "7".to_string())));

    let missing = manager.delete_document("7", Some("dvd"), false).await.unwrap();
    assert!(!missing.ok);
    assert_eq!(missing.status, 404);
}
