use std::path::PathBuf;
use thiserror::Error;

/// Main error type for entgraph
#[derive(Error, Debug)]
pub enum EntityError {
    /// A kind tag or explicit kind name that is not in the registry
    #[error("Unknown entity type: {name}")]
    UnknownEntityType { name: String },

    /// Two entities whose identifying properties disagree
    #[error("Entities of type '{kind}' cannot be merged, conflicting id properties: {properties:?}")]
    EntityMergeConflict {
        kind: String,
        properties: Vec<String>,
    },

    /// Read of a property that is neither set nor declared in the schema
    #[error("'{kind}' entity has no attribute '{attribute}'")]
    UndeclaredAttribute { kind: String, attribute: String },

    /// Entity id that does not belong to the store
    #[error("Entity not found in store: {id}")]
    UnknownEntity { id: usize },

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for entgraph operations
pub type Result<T> = std::result::Result<T, EntityError>;
