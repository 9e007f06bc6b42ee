//! Error types.
//!
//! Each component has its own error enum; [`Error`] wraps them so callers
//! can propagate with `?` and the CLI can still match on the cause.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::kms::Provider;
use crate::core::vault::KeyId;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration problems. The user has to fix these; they are never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required {provider} configuration: {}", .fields.join(", "))]
    MissingField {
        provider: Provider,
        fields: Vec<&'static str>,
    },

    #[error("master key not found at {}", .path.display())]
    MissingSecret { path: PathBuf },

    #[error("master key at {} is not usable: {reason}", .path.display())]
    InvalidEncoding { path: PathBuf, reason: String },

    #[error("master key already exists at {} (use --force to overwrite)", .0.display())]
    SecretExists(PathBuf),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Key vault storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to connect to key vault: {0}")]
    ConnectionFailed(String),

    #[error("conflicting keyAltNames index: {0}")]
    IndexConflict(String),

    #[error("data key with alt name '{0}' was created concurrently")]
    DuplicateKeyRace(String),

    #[error("key vault error: {0}")]
    Backend(String),

    #[error("no key vault backend available (rebuild with --features mongo)")]
    Unavailable,
}

/// Failures reported by the KMS provider while creating a data key.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} rejected the credentials: {cause}")]
    AuthFailure { provider: Provider, cause: String },

    #[error("{provider} did not respond within {}s", .after.as_secs())]
    Timeout { provider: Provider, after: Duration },

    #[error("{provider} refused to create the data key: {cause}")]
    Rejected { provider: Provider, cause: String },
}

impl ProviderError {
    /// Provider the failure came from.
    pub fn provider(&self) -> Provider {
        match self {
            Self::AuthFailure { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Rejected { provider, .. } => *provider,
        }
    }
}

/// Schema construction failures. Fatal at build time.
#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("conflicting rules for '{path}': {first} vs {second}")]
    ConflictingRule {
        path: String,
        first: String,
        second: String,
    },

    #[error("'{parent}' is encrypted as a whole but '{child}' has its own rule")]
    OverlappingPath { parent: String, child: String },

    #[error("invalid field path '{0}'")]
    InvalidPath(String),

    #[error("deterministic encryption does not support bsonType '{bson_type}' (field '{path}')")]
    UnsupportedType { path: String, bson_type: String },

    #[error("invalid field rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("schema references data key {0} which does not exist in the key vault")]
    UnresolvedKey(KeyId),
}

pub type Result<T> = std::result::Result<T, Error>;
