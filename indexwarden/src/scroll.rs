//! Cursor-based iteration over a whole index.

use crate::document::Document;
use crate::engine::SearchEngine;
use crate::error::{Result, WardenError};
use crate::manager::IndexHandle;
use crate::query::Query;
use indexwarden_log::debug;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Default number of documents per cursor batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default cursor time-to-live.
pub const DEFAULT_TTL: &str = "5m";

/// Cursor parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollOptions {
    /// Documents per batch.
    pub batch_size: usize,
    /// Server-side cursor keep-alive, e.g. `"5m"`. Not a client deadline.
    pub ttl: String,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            ttl: DEFAULT_TTL.to_string(),
        }
    }
}

/// Walks every document matching a query through a server-side cursor.
///
/// Size and offset parameters inside the query have no effect; the cursor
/// pages on its own.
///
/// ```rust,no_run
/// use indexwarden::prelude::*;
/// use std::ops::ControlFlow;
///
/// # async fn run(mut manager: IndexManager) -> indexwarden::Result<()> {
/// let iterator = manager.iterator(true).await?.batch_size(500);
/// let seen = iterator
///     .iterate(&Query::of_type("book"), |doc, i, total| {
///         println!("{}/{} {}", i + 1, total, doc.id);
///         ControlFlow::Continue(())
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ScrollIterator {
    engine: Arc<dyn SearchEngine>,
    handle: IndexHandle,
    options: ScrollOptions,
}

impl ScrollIterator {
    /// Iterator over the index behind `handle` with default options.
    pub fn new(engine: Arc<dyn SearchEngine>, handle: IndexHandle) -> Self {
        Self {
            engine,
            handle,
            options: ScrollOptions::default(),
        }
    }

    /// Replace all options.
    pub fn with_options(mut self, options: ScrollOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    /// Set the cursor time-to-live.
    pub fn ttl(mut self, ttl: impl Into<String>) -> Self {
        self.options.ttl = ttl.into();
        self
    }

    /// Index being iterated.
    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }

    /// Current options.
    pub fn options(&self) -> &ScrollOptions {
        &self.options
    }

    /// Call `on_item(doc, i, total)` for every matching document, `total`
    /// being the hit count reported with the first batch.
    ///
    /// Returning [`ControlFlow::Break`] stops at once: no further cursor
    /// request is made. Otherwise batches are requested until one comes back
    /// empty. Failed cursor requests are returned as they are.
    ///
    /// Returns how many documents were passed to `on_item`. A batch size of
    /// zero is rejected before any cursor is opened.
    pub async fn iterate<F>(&self, query: &Query, mut on_item: F) -> Result<usize>
    where
        F: FnMut(Document, usize, u64) -> ControlFlow<()>,
    {
        if self.options.batch_size == 0 {
            return Err(WardenError::Config(format!(
                "Scroll over index \"{}\" needs a batch size of at least 1",
                self.handle.name()
            )));
        }
        let ttl = self.options.ttl.as_str();
        debug!(
            "Scrolling index {} (batch {}, ttl {})",
            self.handle.name(),
            self.options.batch_size,
            ttl
        );

        let mut page = self
            .engine
            .open_scroll(self.handle.name(), query, self.options.batch_size, ttl)
            .await?;
        let total = page.total;
        let mut i = 0;

        while !page.hits.is_empty() {
            for doc in page.hits {
                let flow = on_item(doc, i, total);
                i += 1;
                if flow.is_break() {
                    debug!("Scroll over {} stopped after {} documents", self.handle.name(), i);
                    return Ok(i);
                }
            }

            let Some(scroll_id) = page.scroll_id else {
                break;
            };
            page = self.engine.next_scroll(&scroll_id, ttl).await?;
        }

        Ok(i)
    }

    /// Collect every matching document.
    pub async fn collect(&self, query: &Query) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        self.iterate(query, |doc, _, _| {
            docs.push(doc);
            ControlFlow::Continue(())
        })
        .await?;
        Ok(docs)
    }
}

impl std::fmt::Debug for ScrollIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollIterator")
            .field("handle", &self.handle)
            .field("options", &self.options)
            .finish()
    }
}
