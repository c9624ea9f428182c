//! Typed builders for engine settings and per-type mappings.
//!
//! Configurations carry settings and mappings as opaque JSON. These builders
//! are a convenience for producing that JSON without hand-writing it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Index-level settings passed verbatim at creation time.
#[derive(Debug, Clone, Default)]
pub struct IndexSettings {
    /// Number of primary shards.
    pub number_of_shards: Option<u32>,
    /// Number of replicas.
    pub number_of_replicas: Option<u32>,
    /// Refresh interval, e.g. `"1s"` or `"-1"` during bulk loads.
    pub refresh_interval: Option<String>,
    /// Analysis block (analyzers, tokenizers, filters).
    pub analysis: Option<Value>,
}

impl IndexSettings {
    /// Create empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of shards.
    pub fn shards(mut self, shards: u32) -> Self {
        self.number_of_shards = Some(shards);
        self
    }

    /// Set number of replicas.
    pub fn replicas(mut self, replicas: u32) -> Self {
        self.number_of_replicas = Some(replicas);
        self
    }

    /// Set refresh interval.
    pub fn refresh_interval(mut self, interval: impl Into<String>) -> Self {
        self.refresh_interval = Some(interval.into());
        self
    }

    /// Set the analysis block.
    pub fn analysis(mut self, analysis: Value) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Render as the `settings` object of an index-create body.
    pub fn to_json(&self) -> Value {
        let mut settings = Map::new();

        if let Some(shards) = self.number_of_shards {
            settings.insert("number_of_shards".to_string(), json!(shards));
        }
        if let Some(replicas) = self.number_of_replicas {
            settings.insert("number_of_replicas".to_string(), json!(replicas));
        }
        if let Some(interval) = &self.refresh_interval {
            settings.insert("refresh_interval".to_string(), json!(interval));
        }
        if let Some(analysis) = &self.analysis {
            settings.insert("analysis".to_string(), analysis.clone());
        }

        Value::Object(settings)
    }
}

/// Field mapping properties for one document type.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    /// Field definitions.
    pub properties: BTreeMap<String, MappingField>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, field: MappingField) -> Self {
        self.properties.insert(name.into(), field);
        self
    }

    /// Render the properties object.
    pub fn to_properties(&self) -> Map<String, Value> {
        self.properties
            .iter()
            .map(|(name, field)| (name.clone(), field.to_json()))
            .collect()
    }
}

/// Field mapping definition.
#[derive(Debug, Clone)]
pub struct MappingField {
    /// Field type.
    pub field_type: FieldType,
    /// Index-time analyzer.
    pub analyzer: Option<String>,
    /// Search-time analyzer.
    pub search_analyzer: Option<String>,
    /// Whether the field is indexed.
    pub index: Option<bool>,
    /// Date format.
    pub format: Option<String>,
    /// Sub-fields indexed from the same value.
    pub fields: BTreeMap<String, MappingField>,
    /// Nested properties (object/nested types).
    pub properties: BTreeMap<String, MappingField>,
}

impl MappingField {
    /// Field of the given type with no options.
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            analyzer: None,
            search_analyzer: None,
            index: None,
            format: None,
            fields: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Full-text field.
    pub fn text() -> Self {
        Self::of(FieldType::Text)
    }

    /// Exact-match keyword field.
    pub fn keyword() -> Self {
        Self::of(FieldType::Keyword)
    }

    /// 64-bit integer field.
    pub fn long() -> Self {
        Self::of(FieldType::Long)
    }

    /// Double precision field.
    pub fn double() -> Self {
        Self::of(FieldType::Double)
    }

    /// Boolean field.
    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    /// Date field.
    pub fn date() -> Self {
        Self::of(FieldType::Date)
    }

    /// Object field.
    pub fn object() -> Self {
        Self::of(FieldType::Object)
    }

    /// Set the index-time analyzer.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Set the search-time analyzer.
    pub fn search_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.search_analyzer = Some(analyzer.into());
        self
    }

    /// Store but do not index the field.
    pub fn not_indexed(mut self) -> Self {
        self.index = Some(false);
        self
    }

    /// Set the date format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Add a sub-field (multi-field indexing of the same value).
    pub fn sub_field(mut self, name: impl Into<String>, field: MappingField) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Add a nested property.
    pub fn property(mut self, name: impl Into<String>, field: MappingField) -> Self {
        self.properties.insert(name.into(), field);
        self
    }

    /// Render as a mapping JSON object.
    pub fn to_json(&self) -> Value {
        let mut field = Map::new();

        field.insert("type".to_string(), json!(self.field_type.as_str()));

        if let Some(analyzer) = &self.analyzer {
            field.insert("analyzer".to_string(), json!(analyzer));
        }
        if let Some(search_analyzer) = &self.search_analyzer {
            field.insert("search_analyzer".to_string(), json!(search_analyzer));
        }
        if let Some(index) = self.index {
            field.insert("index".to_string(), json!(index));
        }
        if let Some(format) = &self.format {
            field.insert("format".to_string(), json!(format));
        }
        if !self.fields.is_empty() {
            let fields: Map<String, Value> = self
                .fields
                .iter()
                .map(|(name, sub)| (name.clone(), sub.to_json()))
                .collect();
            field.insert("fields".to_string(), Value::Object(fields));
        }
        if !self.properties.is_empty() {
            let props: Map<String, Value> = self
                .properties
                .iter()
                .map(|(name, prop)| (name.clone(), prop.to_json()))
                .collect();
            field.insert("properties".to_string(), Value::Object(props));
        }

        Value::Object(field)
    }
}

/// Field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Full-text searchable field.
    Text,
    /// Exact match keyword field.
    Keyword,
    /// 64-bit integer.
    Long,
    /// 32-bit integer.
    Integer,
    /// Double precision float.
    Double,
    /// Single precision float.
    Float,
    /// Boolean.
    Boolean,
    /// Date.
    Date,
    /// IP address.
    Ip,
    /// Geo point.
    GeoPoint,
    /// Nested object.
    Nested,
    /// Object.
    Object,
    /// Search-as-you-type.
    SearchAsYouType,
}

impl FieldType {
    /// Engine name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Ip => "ip",
            FieldType::GeoPoint => "geo_point",
            FieldType::Nested => "nested",
            FieldType::Object => "object",
            FieldType::SearchAsYouType => "search_as_you_type",
        }
    }
}
