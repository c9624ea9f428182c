//! Logical index configuration.
//!
//! A configuration describes one logical index: its stable name, an optional
//! default alias used for zero-downtime rotation, the engine settings blob,
//! and the mapping of every declared document type. It is supplied once and
//! never changes for the lifetime of the managers built on it.

use crate::error::{Result, WardenError};
use crate::schema::{IndexSettings, Mapping};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Capability set of an index configuration.
///
/// Implement this directly for configurations computed in code, or use
/// [`IndexDefinition`] for declarative ones.
pub trait IndexConfiguration: Send + Sync {
    /// Stable logical name; also the default index name.
    fn name(&self) -> &str;

    /// Default alias used for rotation. `None` disables the default-alias
    /// operations.
    fn alias(&self) -> Option<&str> {
        None
    }

    /// Declared document types, in order.
    fn types(&self) -> Vec<String>;

    /// Engine settings passed verbatim at creation time.
    fn settings(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Mapping properties for one type.
    fn mapping_properties(&self, type_name: &str) -> Map<String, Value>;

    /// Extra mapping parameters for one type (`dynamic`, `_source`, ...).
    fn mapping_params(&self, _type_name: &str) -> Map<String, Value> {
        Map::new()
    }
}

/// Mapping of one document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Type name.
    pub name: String,
    /// Field mapping properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Extra mapping parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl TypeDefinition {
    /// Declare a type with an empty mapping.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Map::new(),
            params: Map::new(),
        }
    }

    /// Use the properties of a typed [`Mapping`].
    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.properties = mapping.to_properties();
        self
    }

    /// Set raw JSON properties.
    pub fn properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Add a mapping parameter.
    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// Declarative configuration, buildable in code or loadable from TOML/JSON.
///
/// ```toml
/// name = "shop"
/// alias = "shop_live"
///
/// [settings]
/// number_of_shards = 4
///
/// [[types]]
/// name = "book"
/// [types.properties.author]
/// type = "text"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Stable logical name.
    pub name: String,
    /// Default alias.
    #[serde(default)]
    pub alias: Option<String>,
    /// Engine settings blob.
    #[serde(default = "empty_object")]
    pub settings: Value,
    /// Declared types, in order.
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl IndexDefinition {
    /// Create a definition with no alias, settings or types.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            settings: empty_object(),
            types: Vec::new(),
        }
    }

    /// Set the default alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Use typed settings.
    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings.to_json();
        self
    }

    /// Use a raw settings blob.
    pub fn with_raw_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// Declare a type. Redeclaring a name replaces the earlier definition in
    /// place, so declaration order is kept.
    pub fn with_type(mut self, definition: TypeDefinition) -> Self {
        match self.types.iter_mut().find(|t| t.name == definition.name) {
            Some(existing) => *existing = definition,
            None => self.types.push(definition),
        }
        self
    }

    /// Load from a `.toml` or `.json` file and validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WardenError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .ok_or_else(|| WardenError::Config("No file extension found".to_string()))?;

        match ext.as_str() {
            "toml" => Self::from_toml(&content),
            "json" => Self::from_json(&content),
            other => Err(WardenError::Config(format!(
                "Unsupported configuration format: {}",
                other
            ))),
        }
    }

    /// Parse TOML and validate.
    pub fn from_toml(content: &str) -> Result<Self> {
        let definition: Self = toml::from_str(content)
            .map_err(|e| WardenError::Config(format!("TOML parse error: {}", e)))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Parse JSON and validate.
    pub fn from_json(content: &str) -> Result<Self> {
        let definition: Self = serde_json::from_str(content)
            .map_err(|e| WardenError::Config(format!("JSON parse error: {}", e)))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Reject empty names, empty type names and duplicate types.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WardenError::Config("Index name must not be empty".to_string()));
        }
        if matches!(&self.alias, Some(alias) if alias.trim().is_empty()) {
            return Err(WardenError::Config(format!(
                "Configuration \"{}\" declares an empty alias",
                self.name
            )));
        }
        if !self.settings.is_object() {
            return Err(WardenError::Config(format!(
                "Configuration \"{}\" settings must be an object",
                self.name
            )));
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.types.len());
        for ty in &self.types {
            if ty.name.trim().is_empty() {
                return Err(WardenError::Config(format!(
                    "Configuration \"{}\" declares a type with an empty name",
                    self.name
                )));
            }
            if seen.contains(&ty.name.as_str()) {
                return Err(WardenError::Config(format!(
                    "Configuration \"{}\" declares type \"{}\" twice",
                    self.name, ty.name
                )));
            }
            seen.push(&ty.name);
        }

        Ok(())
    }

    fn type_definition(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == type_name)
    }
}

impl IndexConfiguration for IndexDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn types(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }

    fn settings(&self) -> Value {
        self.settings.clone()
    }

    fn mapping_properties(&self, type_name: &str) -> Map<String, Value> {
        self.type_definition(type_name)
            .map(|t| t.properties.clone())
            .unwrap_or_default()
    }

    fn mapping_params(&self, type_name: &str) -> Map<String, Value> {
        self.type_definition(type_name)
            .map(|t| t.params.clone())
            .unwrap_or_default()
    }
}
