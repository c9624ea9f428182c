mod common;

use common::*;
use indexwarden::prelude::*;
use indexwarden::ScrollOptions;
use std::ops::ControlFlow;

async fn populated_shop() -> (InMemoryEngine, IndexManager) {
    let (engine, mut manager) = shop();
    manager.populate(PopulateOptions::new(), None).await.unwrap();
    engine.clear_calls();
    (engine, manager)
}

#[tokio::test]
async fn test_total_reported_on_first_item() {
    let (_engine, mut manager) = populated_shop().await;
    let iterator = manager.iterator(false).await.unwrap().batch_size(2);

    let mut calls = Vec::new();
    let visited = iterator
        .iterate(&Query::match_all(), |doc, i, total| {
            calls.push((doc.id, i, total));
            ControlFlow::Continue(())
        })
        .await
        .unwrap();

    assert_eq!(visited, 4);
    assert_eq!(calls[0].2, 4);
    let indices: Vec<usize> = calls.iter().map(|c| c.1).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_stop_on_first_item_issues_no_cursor_advance() {
    let (engine, mut manager) = populated_shop().await;
    let iterator = manager.iterator(false).await.unwrap().batch_size(2);

    let mut invocations = 0;
    let visited = iterator
        .iterate(&Query::match_all(), |_, _, _| {
            invocations += 1;
            ControlFlow::Break(())
        })
        .await
        .unwrap();

    assert_eq!(visited, 1);
    assert_eq!(invocations, 1);
    assert_eq!(engine.call_count("open_scroll"), 1);
    assert!(!engine.was_called("next_scroll"));
}

#[tokio::test]
async fn test_stop_inside_second_batch() {
    let (engine, mut manager) = populated_shop().await;
    let iterator = manager.iterator(false).await.unwrap().batch_size(2);

    let visited = iterator
        .iterate(&Query::match_all(), |_, i, _| {
            if i == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await
        .unwrap();

    assert_eq!(visited, 3);
    assert_eq!(engine.call_count("next_scroll"), 1);
}

#[tokio::test]
async fn test_type_query_yields_canonical_documents() {
    let (_engine, mut manager) = populated_shop().await;
    let iterator = manager.iterator(false).await.unwrap();

    let dvds = iterator.collect(&Query::of_type("dvd")).await.unwrap();
    let ids: Vec<&str> = dvds.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4"]);
    assert!(dvds.iter().all(|doc| doc.type_name == "dvd"));
    assert!(dvds.iter().all(|doc| doc.get("id").is_none() && doc.get("director").is_some()));
}

#[tokio::test]
async fn test_iterator_by_alias_and_options() {
    let (engine, mut manager) = populated_shop().await;
    manager.add_default_alias(true).await.unwrap();

    let iterator = manager.iterator(true).await.unwrap().with_options(ScrollOptions {
        batch_size: 3,
        ttl: "30s".to_string(),
    });
    assert_eq!(iterator.handle().alias(), Some(SHOP_ALIAS));

    let docs = iterator.collect(&Query::match_all()).await.unwrap();
    assert_eq!(docs.len(), 4);
    assert_eq!(engine.calls_to("open_scroll"), vec![vec!["shop", "3", "30s"]]);
}

#[tokio::test]
async fn test_iterator_requires_resolvable_index() {
    let (_engine, mut manager) = shop();
    assert!(matches!(
        manager.iterator(false).await,
        Err(WardenError::IndexNotFound { by_alias: false, .. })
    ));
    assert!(matches!(
        manager.iterator(true).await,
        Err(WardenError::IndexNotFound { by_alias: true, .. })
    ));
}

#[tokio::test]
async fn test_unrefreshed_writes_are_not_scrolled() {
    let (engine, mut manager) = populated_shop().await;
    let extra = Document::from_value("5", "book", serde_json::json!({ "name": "Neuromancer" }))
        .unwrap();
    engine.index_document(SHOP, &extra).await.unwrap();

    let iterator = manager.iterator(false).await.unwrap();
    assert_eq!(iterator.collect(&Query::match_all()).await.unwrap().len(), 4);

    engine.refresh(SHOP).await.unwrap();
    assert_eq!(iterator.collect(&Query::match_all()).await.unwrap().len(), 5);
}
