//! Data provider contract.
//!
//! A provider supplies the rows a population run loads, the data needed to
//! refresh one document, and the transform that turns a row into a
//! [`Document`]. Providers are owned by the caller and only invoked by the
//! pipeline.

use crate::document::{Document, Row};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::pin::Pin;

/// Progress hook called with `(index, total)` before each row is written.
pub type ProgressHook = Box<dyn FnMut(usize, usize) + Send>;

/// Row key holding the document id, used by [`transform_keyed_row`].
pub const ID_KEY: &str = "id";

/// Row key holding the document type, used by [`transform_keyed_row`].
pub const TYPE_KEY: &str = "type";

/// What a provider hands back for a population run.
pub enum RowSet {
    /// A finite, materialised sequence.
    Rows(Vec<Row>),
    /// A lazily produced stream.
    Stream(BoxStream<'static, Row>),
    /// An untyped payload; only a JSON array is accepted as a sequence.
    Raw(Value),
}

impl std::fmt::Debug for RowSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSet::Rows(rows) => f.debug_tuple("Rows").field(&rows.len()).finish(),
            RowSet::Stream(_) => f.write_str("Stream(..)"),
            RowSet::Raw(value) => f.debug_tuple("Raw").field(value).finish(),
        }
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        RowSet::Rows(rows)
    }
}

impl RowSet {
    /// Wrap any `'static` stream of rows.
    pub fn stream(rows: impl futures::Stream<Item = Row> + Send + 'static) -> Self {
        RowSet::Stream(rows.boxed())
    }

    /// Validate and turn into a stream. Returns the row count when it is
    /// known up front.
    ///
    /// Empty sets are rejected with `NoProviderData`; a raw value that is not
    /// an array is rejected with `ProviderIteratorInvalid`.
    pub(crate) async fn into_rows(
        self,
        index: &str,
    ) -> Result<(BoxStream<'static, Row>, Option<usize>)> {
        match self {
            RowSet::Rows(rows) | RowSet::Raw(Value::Array(rows)) => {
                if rows.is_empty() {
                    return Err(WardenError::NoProviderData(index.to_string()));
                }
                let len = rows.len();
                Ok((stream::iter(rows).boxed(), Some(len)))
            }
            RowSet::Stream(rows) => {
                let mut rows = rows.peekable();
                if Pin::new(&mut rows).peek().await.is_none() {
                    return Err(WardenError::NoProviderData(index.to_string()));
                }
                Ok((rows.boxed(), None))
            }
            RowSet::Raw(Value::Null) => Err(WardenError::NoProviderData(index.to_string())),
            RowSet::Raw(_) => Err(WardenError::ProviderIteratorInvalid(index.to_string())),
        }
    }
}

/// Capability set of a data provider.
///
/// Only [`DataProvider::data`] is required. Everything else defaults to
/// absent, and the transform defaults to [`transform_keyed_row`].
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Rows to load for `type_name`, or for every type when `None`.
    async fn data(&self, type_name: Option<&str>) -> Result<Option<RowSet>>;

    /// Total row count for progress reporting. Called after [`data`], and
    /// expected to describe the same result.
    ///
    /// [`data`]: DataProvider::data
    async fn total(&self, _type_name: Option<&str>) -> Option<usize> {
        None
    }

    /// Provider-owned hook run alongside the caller's progress callback, e.g.
    /// to release resources between memory-heavy batches.
    fn iteration_hook(&self) -> Option<ProgressHook> {
        None
    }

    /// The row for a single document. Must have the same shape as a row
    /// from [`DataProvider::data`].
    async fn document_data(&self, _id: &str, _type_name: Option<&str>) -> Result<Option<Row>> {
        Ok(None)
    }

    /// Turn one row into a document. `type_name` is the type passed to the
    /// population or update call, if any.
    fn transform_row(&self, row: Row, type_name: Option<&str>) -> Option<Document> {
        transform_keyed_row(row, type_name)
    }
}

/// Transform a JSON object row carrying its id under `"id"` and its type under
/// `"type"`. Both keys are removed from the payload. Rows without a `"type"`
/// key take `type_name`.
pub fn transform_keyed_row(row: Row, type_name: Option<&str>) -> Option<Document> {
    let Value::Object(mut payload) = row else {
        return None;
    };

    let id = match payload.remove(ID_KEY)? {
        Value::String(id) => id,
        Value::Number(id) => id.to_string(),
        _ => return None,
    };

    let type_name = match payload.remove(TYPE_KEY) {
        Some(Value::String(ty)) => ty,
        Some(_) => return None,
        None => type_name?.to_string(),
    };

    Some(Document::new(id, type_name, payload))
}

/// Provider over an in-memory list of keyed JSON rows.
///
/// Rows carry their id and type under `"id"` and `"type"`. Filtering by type
/// happens in [`DataProvider::data`].
#[derive(Debug, Clone, Default)]
pub struct JsonRowProvider {
    rows: Vec<Row>,
}

impl JsonRowProvider {
    /// Create a provider over `rows`.
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Append a row.
    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    fn matching(&self, type_name: Option<&str>) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| match type_name {
            Some(ty) => row.get(TYPE_KEY).and_then(Value::as_str) == Some(ty),
            None => true,
        })
    }
}

fn id_matches(row: &Row, id: &str) -> bool {
    match row.get(ID_KEY) {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

#[async_trait]
impl DataProvider for JsonRowProvider {
    async fn data(&self, type_name: Option<&str>) -> Result<Option<RowSet>> {
        let rows: Vec<Row> = self.matching(type_name).cloned().collect();
        Ok(Some(RowSet::Rows(rows)))
    }

    async fn total(&self, type_name: Option<&str>) -> Option<usize> {
        Some(self.matching(type_name).count())
    }

    async fn document_data(&self, id: &str, type_name: Option<&str>) -> Result<Option<Row>> {
        Ok(self.matching(type_name).find(|row| id_matches(row, id)).cloned())
    }
}
