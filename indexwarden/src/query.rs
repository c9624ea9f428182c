//! Engine-neutral query model used by scroll iteration and delete-by-query.

use crate::document::Document;
use crate::error::{Result, WardenError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A query over the documents of one index.
///
/// The OpenSearch adapter renders these to query DSL; the in-memory engine
/// evaluates them directly (everything but [`Query::Raw`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Every document.
    #[default]
    MatchAll,
    /// Documents of one logical type.
    Type(String),
    /// Documents whose id is one of these, across all types.
    Ids(Vec<String>),
    /// Exact match on a payload field.
    Term {
        /// Field name.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// Match any of several values on a payload field.
    Terms {
        /// Field name.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Boolean combination.
    Bool(BoolQuery),
    /// Raw engine query DSL.
    Raw(Value),
}

impl Query {
    /// Match every document.
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    /// Restrict to one document type.
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Query::Type(type_name.into())
    }

    /// Match a single id across types.
    pub fn id(id: impl Into<String>) -> Self {
        Query::Ids(vec![id.into()])
    }

    /// Exact match on a field.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Match any of several values.
    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        Query::Terms {
            field: field.into(),
            values,
        }
    }

    /// Raw query DSL.
    pub fn raw(query: Value) -> Self {
        Query::Raw(query)
    }

    /// Evaluate against a document.
    ///
    /// Raw queries cannot be evaluated locally and yield [`WardenError::Query`].
    pub fn matches(&self, doc: &Document) -> Result<bool> {
        Ok(match self {
            Query::MatchAll => true,
            Query::Type(ty) => doc.type_name == *ty,
            Query::Ids(ids) => ids.iter().any(|id| *id == doc.id),
            Query::Term { field, value } => field_matches(doc, field, value),
            Query::Terms { field, values } => {
                values.iter().any(|value| field_matches(doc, field, value))
            }
            Query::Bool(b) => b.matches(doc)?,
            Query::Raw(_) => {
                return Err(WardenError::Query(
                    "raw queries can only be evaluated by a search engine".to_string(),
                ));
            }
        })
    }
}

fn field_matches(doc: &Document, field: &str, expected: &Value) -> bool {
    match doc.get(field) {
        Some(Value::Array(items)) => items.contains(expected),
        Some(actual) => actual == expected,
        None => false,
    }
}

/// Bool query: all of `must` and `filter`, none of `must_not`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    /// Scored clauses that must match.
    pub must: Vec<Query>,
    /// Unscored clauses that must match.
    pub filter: Vec<Query>,
    /// Clauses that must not match.
    pub must_not: Vec<Query>,
}

impl BoolQuery {
    /// Empty bool query (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a must clause.
    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    /// Add a filter clause.
    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    /// Add a must-not clause.
    pub fn must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    /// Finish into a [`Query`].
    pub fn build(self) -> Query {
        Query::Bool(self)
    }

    fn matches(&self, doc: &Document) -> Result<bool> {
        for clause in self.must.iter().chain(&self.filter) {
            if !clause.matches(doc)? {
                return Ok(false);
            }
        }
        for clause in &self.must_not {
            if clause.matches(doc)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
