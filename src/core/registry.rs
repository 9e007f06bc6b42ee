//! Data key registry.
//!
//! Guarantees one data key per alt name in a key vault. Lookups come first,
//! so repeated runs never accumulate key material; creation is serialized per
//! alt name within the process, and a duplicate key error from the vault
//! (another process won) is resolved by reading the winner's record.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::kms::{MasterKeyMaterial, MasterKeySpec};
use crate::core::schema::SchemaDocument;
use crate::core::vault::{CreateKeyRequest, DataKeyRecord, IndexOutcome, KeyId, KeyVault};
use crate::error::{ConfigError, Error, Result, SchemaError, StorageError};

/// How `find_or_create` obtained its record.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// The key already existed and was returned unchanged.
    Found(DataKeyRecord),
    /// A new key was created by this call.
    Created(DataKeyRecord),
    /// Another writer created the key first; its record was returned.
    RaceRecovered(DataKeyRecord),
}

impl KeyOutcome {
    pub fn record(&self) -> &DataKeyRecord {
        match self {
            Self::Found(r) | Self::Created(r) | Self::RaceRecovered(r) => r,
        }
    }

    pub fn into_record(self) -> DataKeyRecord {
        match self {
            Self::Found(r) | Self::Created(r) | Self::RaceRecovered(r) => r,
        }
    }

    pub fn id(&self) -> KeyId {
        self.record().id
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::Created(_) => "created",
            Self::RaceRecovered(_) => "race recovered",
        }
    }
}

/// Find-or-create front end over a [`KeyVault`].
pub struct DataKeyRegistry<V> {
    vault: V,
    timeout: Duration,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<V: KeyVault> DataKeyRegistry<V> {
    /// `timeout` bounds each provider round trip.
    pub fn new(vault: V, timeout: Duration) -> Self {
        Self {
            vault,
            timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Ensure the partial unique index on `keyAltNames`. Safe on every startup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::IndexConflict` if a differently shaped index exists.
    pub fn ensure_index(&self) -> Result<IndexOutcome> {
        let outcome = self.vault.ensure_alt_name_index()?;
        debug!(namespace = %self.vault.namespace(), ?outcome, "keyAltNames index");
        Ok(outcome)
    }

    /// Return the data key for `alt_name`, creating it if it does not exist.
    ///
    /// Provider failures are returned as-is and never retried.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidValue` for an empty alt name
    /// - `ProviderError` if the KMS provider fails or times out
    /// - `StorageError` if the vault fails
    pub fn find_or_create(
        &self,
        alt_name: &str,
        material: &MasterKeyMaterial,
        spec: &MasterKeySpec,
    ) -> Result<KeyOutcome> {
        if alt_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "key_alt_name",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        let lock = self.lock_for(alt_name);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.find_or_create_locked(alt_name, material, spec)
        };
        self.release(alt_name, lock);
        outcome
    }

    fn find_or_create_locked(
        &self,
        alt_name: &str,
        material: &MasterKeyMaterial,
        spec: &MasterKeySpec,
    ) -> Result<KeyOutcome> {
        if let Some(record) = self.vault.find_by_alt_name(alt_name)? {
            debug!(alt_name, id = %record.id, "data key found");
            return Ok(KeyOutcome::Found(record));
        }

        let request = CreateKeyRequest {
            alt_name,
            material,
            spec,
            timeout: self.timeout,
        };

        match self.vault.create_data_key(&request) {
            Ok(record) => {
                info!(alt_name, id = %record.id, provider = %material.provider(), "data key created");
                Ok(KeyOutcome::Created(record))
            }
            Err(Error::Storage(StorageError::DuplicateKeyRace(name))) => {
                warn!(alt_name, "data key created concurrently, re-reading");
                match self.vault.find_by_alt_name(alt_name)? {
                    Some(record) => Ok(KeyOutcome::RaceRecovered(record)),
                    None => Err(StorageError::DuplicateKeyRace(name).into()),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Check that the key a schema references exists in the vault.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnresolvedKey` if it does not.
    pub fn verify(&self, schema: &SchemaDocument) -> Result<DataKeyRecord> {
        let id = schema.key_id();
        match self.vault.find_by_id(id)? {
            Some(record) => Ok(record),
            None => Err(SchemaError::UnresolvedKey(id).into()),
        }
    }

    fn lock_for(&self, alt_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(alt_name.to_string()).or_default())
    }

    /// Drop the alt name's lock once no other caller holds or waits on it,
    /// so the map only holds names in flight.
    fn release(&self, alt_name: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here. Others are taken under this
        // map lock, so the count cannot grow while it is held.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(alt_name);
        }
    }

    #[cfg(test)]
    fn locks_held(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
