//! Canonical document unit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw row as produced by a data provider.
pub type Row = Value;

/// Field name to value mapping of a document.
pub type Payload = Map<String, Value>;

/// A document ready to be written to (or read back from) an index.
///
/// Documents are built fresh per row by a provider transform and handed to the
/// engine; nothing keeps them afterwards.
///
/// # Example
///
/// ```rust
/// use indexwarden::Document;
/// use serde_json::json;
///
/// let doc = Document::from_value("1", "book", json!({ "name": "Fight Club" })).unwrap();
/// assert_eq!(doc.get("name"), Some(&json!("Fight Club")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, unique within its type.
    pub id: String,
    /// Logical document type; one of the configuration's types.
    pub type_name: String,
    /// Field payload.
    pub payload: Payload,
}

impl Document {
    /// Create a document from an already-built payload.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            payload,
        }
    }

    /// Create a document from a JSON value. Returns `None` unless the value is
    /// an object.
    pub fn from_value(
        id: impl Into<String>,
        type_name: impl Into<String>,
        value: Value,
    ) -> Option<Self> {
        match value {
            Value::Object(payload) => Some(Self::new(id, type_name, payload)),
            _ => None,
        }
    }

    /// Field accessor.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Reason the document cannot be written, if any.
    pub(crate) fn malformation(&self) -> Option<String> {
        if self.id.trim().is_empty() {
            return Some("document id is empty".to_string());
        }
        if self.type_name.trim().is_empty() {
            return Some(format!("document {} has an empty type name", self.id));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_object() {
        assert!(Document::from_value("1", "book", json!({"a": 1})).is_some());
        assert!(Document::from_value("1", "book", json!([1, 2])).is_none());
        assert!(Document::from_value("1", "book", Value::Null).is_none());
    }

    #[test]
    fn test_well_formed_document() {
        let doc = Document::from_value("1", "book", json!({})).unwrap();
        assert_eq!(doc.malformation(), None);
    }

    #[test]
    fn test_malformed_documents() {
        let empty_id = Document::new(" ", "book", Payload::new());
        assert!(empty_id.malformation().is_some());

        let untyped = Document::new("7", "", Payload::new());
        let reason = untyped.malformation().unwrap();
        assert!(reason.contains("empty type"));
    }
}
