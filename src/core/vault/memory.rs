//! In-memory key vault.
//!
//! Behaves like the database collection as far as the registry can tell:
//! the `keyAltNames` index is only enforced once it has been created, and
//! it is enforced at write time, so racing creators see a duplicate key
//! error rather than two records. No key material is generated or wrapped.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, trace};

use super::{CreateKeyRequest, DataKeyRecord, IndexOutcome, KeyId, KeyVault};
use crate::core::constants::{DEFAULT_KEY_VAULT_COLL, DEFAULT_KEY_VAULT_DB, KEY_ALT_NAMES_INDEX};
use crate::core::namespace::Namespace;
use crate::error::{ProviderError, Result, StorageError};

/// An index over `keyAltNames`.
#[derive(Debug, Clone)]
struct AltNameIndex {
    name: String,
    unique: bool,
    partial: bool,
}

impl AltNameIndex {
    fn expected() -> Self {
        Self {
            name: KEY_ALT_NAMES_INDEX.to_string(),
            unique: true,
            partial: true,
        }
    }

    /// Unique and partial, whatever it is called.
    fn satisfies(&self) -> bool {
        self.unique && self.partial
    }
}

#[derive(Debug, Default)]
struct State {
    records: Vec<DataKeyRecord>,
    index: Option<AltNameIndex>,
}

/// Key vault kept in process memory.
#[derive(Debug)]
pub struct MemoryVault {
    namespace: Namespace,
    state: Mutex<State>,
    latency: Duration,
    auth_failure: Option<String>,
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new(Namespace::new(DEFAULT_KEY_VAULT_DB, DEFAULT_KEY_VAULT_COLL))
    }
}

impl MemoryVault {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            state: Mutex::new(State::default()),
            latency: Duration::ZERO,
            auth_failure: None,
        }
    }

    /// Simulate a slow provider. Creates that take longer than the request
    /// timeout fail with `ProviderError::Timeout`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Simulate a provider that rejects the credentials.
    pub fn with_auth_failure(mut self, cause: impl Into<String>) -> Self {
        self.auth_failure = Some(cause.into());
        self
    }

    /// Pre-create an index on `keyAltNames`, as an operator might have.
    pub fn with_index(self, name: impl Into<String>, unique: bool, partial: bool) -> Self {
        self.lock().index = Some(AltNameIndex {
            name: name.into(),
            unique,
            partial,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_index(&self) -> bool {
        self.lock().index.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge every other caller.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyVault for MemoryVault {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn ensure_alt_name_index(&self) -> Result<IndexOutcome> {
        let mut state = self.lock();

        if let Some(index) = &state.index {
            if index.satisfies() {
                return Ok(IndexOutcome::AlreadyPresent);
            }
            return Err(StorageError::IndexConflict(format!(
                "index '{}' exists with unique={} partial={}",
                index.name, index.unique, index.partial
            ))
            .into());
        }

        debug!(namespace = %self.namespace, "creating keyAltNames index");
        state.index = Some(AltNameIndex::expected());
        Ok(IndexOutcome::Created)
    }

    fn find_by_alt_name(&self, alt_name: &str) -> Result<Option<DataKeyRecord>> {
        Ok(self
            .lock()
            .records
            .iter()
            .find(|r| r.has_alt_name(alt_name))
            .cloned())
    }

    fn find_by_id(&self, id: KeyId) -> Result<Option<DataKeyRecord>> {
        Ok(self.lock().records.iter().find(|r| r.id == id).cloned())
    }

    fn create_data_key(&self, request: &CreateKeyRequest<'_>) -> Result<DataKeyRecord> {
        let provider = request.material.provider();

        if let Some(cause) = &self.auth_failure {
            return Err(ProviderError::AuthFailure {
                provider,
                cause: cause.clone(),
            }
            .into());
        }

        if request.spec.provider() != provider {
            return Err(ProviderError::Rejected {
                provider,
                cause: format!("master key spec is for {}", request.spec.provider()),
            }
            .into());
        }

        if self.latency > request.timeout {
            std::thread::sleep(request.timeout);
            return Err(ProviderError::Timeout {
                provider,
                after: request.timeout,
            }
            .into());
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let mut state = self.lock();
        let enforced = state.index.as_ref().is_some_and(|i| i.unique);
        if enforced && state.records.iter().any(|r| r.has_alt_name(request.alt_name)) {
            trace!(alt_name = request.alt_name, "duplicate key on insert");
            return Err(StorageError::DuplicateKeyRace(request.alt_name.to_string()).into());
        }

        let record = DataKeyRecord {
            id: KeyId::new_v4(),
            key_alt_names: vec![request.alt_name.to_string()],
            master_key: request.spec.clone(),
            created_at: Utc::now(),
        };
        state.records.push(record.clone());

        debug!(alt_name = request.alt_name, id = %record.id, %provider, "data key inserted");
        Ok(record)
    }
}
