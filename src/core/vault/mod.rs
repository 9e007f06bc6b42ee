//! Key vault storage.
//!
//! A key vault is the collection that holds wrapped data keys, one document
//! per key. The registry talks to it through the [`KeyVault`] trait so the
//! find-or-create logic can run against the real database or in memory.
//!
//! ## Backends
//!
//! - **memory**: Always available. Enforces the alt-name index at write time.
//! - **mongo**: Feature-gated (`mongo`). Uses the MongoDB driver's
//!   `ClientEncryption` to wrap keys with the configured KMS provider.
//!
//! ## Adding a New Backend
//!
//! 1. Implement the `KeyVault` trait
//! 2. Report a violated alt-name index as `StorageError::DuplicateKeyRace`
//! 3. Feature-gate if it pulls in a driver
//! 4. Re-export from this module

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::kms::{MasterKeyMaterial, MasterKeySpec, Provider};
use crate::core::namespace::Namespace;
use crate::core::types::AltName;
use crate::error::{ConfigError, Result};

mod memory;

#[cfg(feature = "mongo")]
pub mod mongo;

pub use memory::MemoryVault;

/// Identifier of a data key: 16 bytes shaped like a UUID.
///
/// Displays as base64 of the raw bytes, the form the driver prints and
/// schemas embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(Uuid);

impl KeyId {
    /// A fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.as_bytes())
    }

    /// Hyphenated UUID form.
    pub fn to_uuid_string(&self) -> String {
        self.0.hyphenated().to_string()
    }

    /// Parse the base64 form.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `s` is not base64 of 16 bytes.
    pub fn from_base64(s: &str) -> std::result::Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: "key id",
            reason,
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map_err(|e| invalid(format!("'{}' is not base64: {}", s, e)))?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| invalid(format!("expected 16 bytes, decoded {}", b.len())))?;
        Ok(Self::from_bytes(bytes))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl FromStr for KeyId {
    type Err = ConfigError;

    /// Accepts base64 or a hyphenated UUID.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match Uuid::parse_str(s.trim()) {
            Ok(uuid) => Ok(Self(uuid)),
            Err(_) => Self::from_base64(s),
        }
    }
}

impl TryFrom<String> for KeyId {
    type Error = ConfigError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyId> for String {
    fn from(id: KeyId) -> Self {
        id.to_base64()
    }
}

/// A data key as stored in the vault. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataKeyRecord {
    pub id: KeyId,
    pub key_alt_names: Vec<AltName>,
    pub master_key: MasterKeySpec,
    pub created_at: DateTime<Utc>,
}

impl DataKeyRecord {
    pub fn provider(&self) -> Provider {
        self.master_key.provider()
    }

    pub fn has_alt_name(&self, alt_name: &str) -> bool {
        self.key_alt_names.iter().any(|name| name == alt_name)
    }
}

/// Result of ensuring the alt-name index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Created,
    AlreadyPresent,
}

/// Everything a backend needs to create one data key.
#[derive(Debug)]
pub struct CreateKeyRequest<'a> {
    pub alt_name: &'a str,
    pub material: &'a MasterKeyMaterial,
    pub spec: &'a MasterKeySpec,
    /// Upper bound for the provider round trip.
    pub timeout: Duration,
}

/// Data key storage.
///
/// Implementations must be safe to share between threads; the registry
/// serializes access per alt name, not per vault.
pub trait KeyVault: Send + Sync {
    /// Namespace of the key vault collection.
    fn namespace(&self) -> &Namespace;

    /// Create the partial unique index over `keyAltNames` if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::IndexConflict` if an index on `keyAltNames`
    /// exists with a different shape.
    fn ensure_alt_name_index(&self) -> Result<IndexOutcome>;

    /// Point lookup of the record carrying `alt_name`.
    fn find_by_alt_name(&self, alt_name: &str) -> Result<Option<DataKeyRecord>>;

    fn find_by_id(&self, id: KeyId) -> Result<Option<DataKeyRecord>>;

    /// Generate key material, wrap it with the master key and insert it.
    ///
    /// # Errors
    ///
    /// - `StorageError::DuplicateKeyRace` if the alt name was taken in the meantime
    /// - `ProviderError` if the KMS provider fails or times out
    fn create_data_key(&self, request: &CreateKeyRequest<'_>) -> Result<DataKeyRecord>;
}

macro_rules! forward_key_vault {
    ($ptr:ident) => {
        impl<V: KeyVault + ?Sized> KeyVault for $ptr<V> {
            fn namespace(&self) -> &Namespace {
                (**self).namespace()
            }

            fn ensure_alt_name_index(&self) -> Result<IndexOutcome> {
                (**self).ensure_alt_name_index()
            }

            fn find_by_alt_name(&self, alt_name: &str) -> Result<Option<DataKeyRecord>> {
                (**self).find_by_alt_name(alt_name)
            }

            fn find_by_id(&self, id: KeyId) -> Result<Option<DataKeyRecord>> {
                (**self).find_by_id(id)
            }

            fn create_data_key(&self, request: &CreateKeyRequest<'_>) -> Result<DataKeyRecord> {
                (**self).create_data_key(request)
            }
        }
    };
}

forward_key_vault!(Box);
forward_key_vault!(Arc);
