//! Error types for index lifecycle operations.

use thiserror::Error;

/// Error type for every indexwarden operation.
///
/// None of these are retried by the library. Engine transport failures are
/// wrapped unchanged in [`WardenError::Client`].
#[derive(Error, Debug)]
pub enum WardenError {
    /// `create` was called without drop permission on an existing index.
    #[error("Index with name \"{0}\" already exists")]
    IndexAlreadyExists(String),

    /// Resolution by name or by alias failed.
    #[error("Index {} \"{}\" not found", lookup_kind(.by_alias), .name)]
    IndexNotFound {
        /// Index name or alias that failed to resolve.
        name: String,
        /// Whether resolution went through the alias.
        by_alias: bool,
    },

    /// An alias operation was attempted on a configuration without a default alias.
    #[error("Configuration \"{0}\" doesn't have a default alias configured")]
    NoAliasConfigured(String),

    /// The provider returned no rows.
    #[error("Index \"{0}\" provider returned no data")]
    NoProviderData(String),

    /// The provider returned something that is not a row sequence or stream.
    #[error("Index \"{0}\" provider must return a row sequence or a row stream")]
    ProviderIteratorInvalid(String),

    /// The provider's row transform did not yield a well-formed document.
    #[error("Index \"{index}\" provider transform produced an invalid document: {reason}")]
    ProviderTransformInvalid {
        /// Target index.
        index: String,
        /// What was wrong with the document.
        reason: String,
    },

    /// No configuration is registered under this name.
    #[error("Unknown configuration: {0}")]
    UnknownConfiguration(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A query the engine cannot evaluate.
    #[error("Query error: {0}")]
    Query(String),

    /// The engine answered with a non-success status.
    #[error("Engine error ({status}): {reason}")]
    Engine {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the engine.
        reason: String,
    },

    /// Transport could not be built.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure from the opensearch crate.
    #[error("Client error: {0}")]
    Client(#[from] opensearch::Error),
}

impl WardenError {
    /// Shorthand for a by-name resolution failure.
    pub fn not_found(name: impl Into<String>) -> Self {
        WardenError::IndexNotFound {
            name: name.into(),
            by_alias: false,
        }
    }

    /// Shorthand for a by-alias resolution failure.
    pub fn alias_not_found(alias: impl Into<String>) -> Self {
        WardenError::IndexNotFound {
            name: alias.into(),
            by_alias: true,
        }
    }
}

fn lookup_kind(by_alias: &bool) -> &'static str {
    if *by_alias { "alias" } else { "with name" }
}

/// Result type alias for indexwarden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
