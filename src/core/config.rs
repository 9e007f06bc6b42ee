//! Configuration file management.
//!
//! Reads and validates `csfle.toml`. Every key is
//! optional; a missing file means "all defaults".
//!
//! ```toml
//! [vault]
//! connection_string = "mongodb://localhost:27017"
//! namespace = "encryption.__keyVault"
//! key_alt_name = "demo-data-key"
//! timeout_secs = 10
//!
//! [kms]
//! provider = "local"
//! master_key_path = "master-key.txt"
//!
//! [schema]
//! namespace = "medicalRecords.patients"
//! fields = ["ssn:int:Deterministic", "bloodType:string:Random"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::core::constants;
use crate::core::kms::Provider;
use crate::core::namespace::Namespace;
use crate::core::schema::FieldRule;
use crate::core::types::AltName;
use crate::error::{ConfigError, Result};

/// Project configuration stored in `csfle.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub vault: VaultSettings,
    pub kms: KmsSettings,
    pub schema: SchemaSettings,
}

/// Where data keys live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultSettings {
    pub connection_string: String,
    pub namespace: Namespace,
    pub key_alt_name: AltName,
    /// Upper bound for a single KMS or key vault call.
    pub timeout_secs: u64,
}

/// Which master key wraps data keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KmsSettings {
    pub provider: Provider,
    /// Base64 key file used by the local provider.
    pub master_key_path: PathBuf,
}

/// The encrypted collection and its field rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaSettings {
    pub namespace: Namespace,
    pub fields: Vec<FieldRule>,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            connection_string: constants::DEFAULT_CONNECTION_STRING.to_string(),
            namespace: Namespace::new(constants::DEFAULT_KEY_VAULT_DB, constants::DEFAULT_KEY_VAULT_COLL),
            key_alt_name: constants::DEFAULT_KEY_ALT_NAME.to_string(),
            timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for KmsSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Local,
            master_key_path: PathBuf::from(constants::MASTER_KEY_FILE),
        }
    }
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            namespace: Namespace::new(constants::DEFAULT_DATA_DB, constants::DEFAULT_DATA_COLL),
            fields: FieldRule::demo(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the TOML is malformed or a value does not
    /// parse, or `ConfigError::InvalidValue` if validation fails.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            debug!("no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;

        debug!(
            provider = %config.kms.provider,
            vault = %config.vault.namespace,
            fields = config.schema.fields.len(),
            "config loaded"
        );

        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but make no sense.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` on the first offending value.
    pub fn validate(&self) -> Result<()> {
        if self.vault.connection_string.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "vault.connection_string",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.vault.key_alt_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "vault.key_alt_name",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.vault.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vault.timeout_secs",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        if self.vault.namespace == self.schema.namespace {
            return Err(ConfigError::InvalidValue {
                field: "schema.namespace",
                reason: format!(
                    "'{}' is the key vault; it cannot also hold encrypted data",
                    self.schema.namespace
                ),
            }
            .into());
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.vault.timeout_secs)
    }
}
