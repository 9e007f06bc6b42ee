//! MongoDB key vault.
//!
//! Enable with `--features mongo`. Data keys are created through the
//! driver's `ClientEncryption`, which asks the KMS provider to wrap fresh
//! key material and inserts the key document itself.
//!
//! The vault owns a current-thread tokio runtime and the driver client.
//! Every operation blocks on that runtime; dropping the vault releases both.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{doc, Binary, Bson, Document};
use mongodb::client_encryption::{
    AwsMasterKey, AzureMasterKey, ClientEncryption, GcpMasterKey, LocalMasterKey, MasterKey,
};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::mongocrypt::ctx::KmsProvider;
use mongodb::options::{ClientOptions, IndexOptions, TlsOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, trace};

use super::{CreateKeyRequest, DataKeyRecord, IndexOutcome, KeyId, KeyVault};
use crate::core::constants::{KEY_ALT_NAMES_FIELD, KEY_ALT_NAMES_INDEX};
use crate::core::kms::{MasterKeyMaterial, MasterKeySpec, Provider};
use crate::core::namespace::Namespace;
use crate::core::schema::SchemaMap;
use crate::error::{Error, ProviderError, Result, StorageError};

const NAMESPACE_NOT_FOUND: i32 = 26;
const DUPLICATE_KEY: i32 = 11000;
const INDEX_OPTIONS_CONFLICT: i32 = 85;
const INDEX_KEY_SPECS_CONFLICT: i32 = 86;

/// Key vault stored in a MongoDB collection.
pub struct MongoVault {
    runtime: tokio::runtime::Runtime,
    client: Client,
    namespace: Namespace,
}

impl std::fmt::Debug for MongoVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoVault")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl MongoVault {
    /// Connect to the cluster holding the key vault.
    ///
    /// `timeout` bounds server selection, so an unreachable cluster fails
    /// on the first operation instead of hanging.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConnectionFailed` if the connection string is
    /// invalid or the runtime cannot start.
    pub fn connect(connection_string: &str, namespace: Namespace, timeout: Duration) -> Result<Self> {
        debug!(%namespace, "connecting to key vault");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::ConnectionFailed(format!("failed to create runtime: {}", e)))?;

        let client = runtime.block_on(async {
            let mut options = ClientOptions::parse(connection_string)
                .await
                .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
            options.server_selection_timeout = Some(timeout);
            Client::with_options(options).map_err(|e| StorageError::ConnectionFailed(e.to_string()))
        })?;

        Ok(Self {
            runtime,
            client,
            namespace,
        })
    }

    /// Run a future on the vault's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Build a client that encrypts and decrypts the fields named in `schema_map`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backend` if the driver rejects the schema or the
    /// encryption options.
    pub fn encrypted_client(
        &self,
        connection_string: &str,
        material: &MasterKeyMaterial,
        schema_map: &SchemaMap,
    ) -> Result<Client> {
        let schemas = schema_map
            .iter()
            .map(|(ns, schema)| Ok((ns.clone(), to_document(schema.to_json()?)?)))
            .collect::<Result<Vec<(String, Document)>>>()?;

        self.block_on(async {
            let options = ClientOptions::parse(connection_string)
                .await
                .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
            let client = Client::encrypted_builder(
                options,
                driver_namespace(&self.namespace),
                [kms_provider(material)],
            )
            .map_err(backend)?
            .schema_map(schemas)
            .build()
            .await
            .map_err(backend)?;
            Ok(client)
        })
    }

    fn collection(&self) -> Collection<Document> {
        self.client
            .database(&self.namespace.db)
            .collection(&self.namespace.coll)
    }

    /// Every index on the key vault collection; none if it does not exist yet.
    async fn indexes(&self) -> Result<Vec<IndexModel>> {
        let mut cursor = match self.collection().list_indexes().await {
            Ok(cursor) => cursor,
            Err(e) => {
                let (code, failure) = failure_of(&e);
                if code == Some(NAMESPACE_NOT_FOUND) {
                    return Ok(Vec::new());
                }
                return Err(storage_error(failure, e.to_string()));
            }
        };

        let mut indexes = Vec::new();
        while cursor.advance().await.map_err(|e| classify_storage(&e))? {
            indexes.push(cursor.deserialize_current().map_err(|e| classify_storage(&e))?);
        }
        Ok(indexes)
    }

    async fn find(&self, filter: Document) -> Result<Option<DataKeyRecord>> {
        let found = self
            .collection()
            .find_one(filter)
            .await
            .map_err(|e| classify_storage(&e))?;
        found.map(record_from_document).transpose()
    }
}

impl KeyVault for MongoVault {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn ensure_alt_name_index(&self) -> Result<IndexOutcome> {
        self.block_on(async {
            if let Some(index) = self.indexes().await?.iter().find(|i| satisfies_shape(i)) {
                let name = index.options.as_ref().and_then(|o| o.name.as_deref());
                debug!(?name, "keyAltNames index present");
                return Ok(IndexOutcome::AlreadyPresent);
            }

            let model = IndexModel::builder()
                .keys(doc! { KEY_ALT_NAMES_FIELD: 1 })
                .options(
                    IndexOptions::builder()
                        .name(KEY_ALT_NAMES_INDEX.to_string())
                        .unique(true)
                        .partial_filter_expression(doc! { KEY_ALT_NAMES_FIELD: { "$exists": true } })
                        .build(),
                )
                .build();

            match self.collection().create_index(model).await {
                Ok(_) => Ok(IndexOutcome::Created),
                Err(e) => {
                    let (code, failure) = failure_of(&e);
                    // Another process may have created a suitable index since the listing.
                    if is_index_conflict(code) && self.indexes().await?.iter().any(satisfies_shape) {
                        return Ok(IndexOutcome::AlreadyPresent);
                    }
                    Err(index_error(code, failure, e.to_string()))
                }
            }
        })
    }

    fn find_by_alt_name(&self, alt_name: &str) -> Result<Option<DataKeyRecord>> {
        trace!(alt_name, "looking up data key");
        self.block_on(self.find(doc! { KEY_ALT_NAMES_FIELD: alt_name }))
    }

    fn find_by_id(&self, id: KeyId) -> Result<Option<DataKeyRecord>> {
        self.block_on(self.find(doc! { "_id": uuid_binary(id) }))
    }

    fn create_data_key(&self, request: &CreateKeyRequest<'_>) -> Result<DataKeyRecord> {
        let provider = request.material.provider();
        let encryption = ClientEncryption::new(
            self.client.clone(),
            driver_namespace(&self.namespace),
            [kms_provider(request.material)],
        )
        .map_err(backend)?;

        let id = self.block_on(async {
            let create = encryption
                .create_data_key(master_key(request.spec))
                .key_alt_names(vec![request.alt_name.to_string()]);

            match tokio::time::timeout(request.timeout, create).await {
                Ok(Ok(id)) => Ok(id),
                Ok(Err(e)) => Err(classify_create(&e, provider, request.alt_name)),
                Err(_) => Err(ProviderError::Timeout {
                    provider,
                    after: request.timeout,
                }
                .into()),
            }
        })?;

        let id = key_id_from_binary(&id)?;
        debug!(alt_name = request.alt_name, %id, %provider, "data key inserted");

        Ok(self.find_by_id(id)?.unwrap_or_else(|| DataKeyRecord {
            id,
            key_alt_names: vec![request.alt_name.to_string()],
            master_key: request.spec.clone(),
            created_at: Utc::now(),
        }))
    }
}

fn driver_namespace(ns: &Namespace) -> mongodb::Namespace {
    mongodb::Namespace::new(&ns.db, &ns.coll)
}

/// Provider credentials in the shape libmongocrypt expects.
fn kms_provider(material: &MasterKeyMaterial) -> (KmsProvider, Document, Option<TlsOptions>) {
    match material {
        MasterKeyMaterial::Local(key) => (
            KmsProvider::local(),
            doc! {
                "key": Binary { subtype: BinarySubtype::Generic, bytes: key.as_bytes().to_vec() },
            },
            None,
        ),
        MasterKeyMaterial::Aws(aws) => (
            KmsProvider::aws(),
            doc! {
                "accessKeyId": aws.credentials.access_key_id.as_str(),
                "secretAccessKey": aws.credentials.secret_access_key.expose(),
            },
            None,
        ),
        MasterKeyMaterial::Azure(azure) => {
            let mut credentials = doc! {
                "tenantId": azure.credentials.tenant_id.as_str(),
                "clientId": azure.credentials.client_id.as_str(),
                "clientSecret": azure.credentials.client_secret.expose(),
            };
            if let Some(endpoint) = &azure.credentials.identity_platform_endpoint {
                credentials.insert("identityPlatformEndpoint", endpoint.as_str());
            }
            (KmsProvider::azure(), credentials, None)
        }
        MasterKeyMaterial::Gcp(gcp) => {
            let mut credentials = doc! {
                "email": gcp.credentials.email.as_str(),
                "privateKey": gcp.credentials.private_key.expose(),
            };
            if let Some(endpoint) = &gcp.credentials.endpoint {
                credentials.insert("endpoint", endpoint.as_str());
            }
            (KmsProvider::gcp(), credentials, None)
        }
    }
}

fn master_key(spec: &MasterKeySpec) -> MasterKey {
    match spec {
        MasterKeySpec::Local => LocalMasterKey::builder().build().into(),
        MasterKeySpec::Aws(aws) => AwsMasterKey::builder()
            .region(aws.region.clone())
            .key(aws.key.clone())
            .endpoint(aws.endpoint.clone())
            .build()
            .into(),
        MasterKeySpec::Azure(azure) => AzureMasterKey::builder()
            .key_vault_endpoint(azure.key_vault_endpoint.clone())
            .key_name(azure.key_name.clone())
            .key_version(azure.key_version.clone())
            .build()
            .into(),
        MasterKeySpec::Gcp(gcp) => GcpMasterKey::builder()
            .project_id(gcp.project_id.clone())
            .location(gcp.location.clone())
            .key_ring(gcp.key_ring.clone())
            .key_name(gcp.key_name.clone())
            .key_version(gcp.key_version.clone())
            .endpoint(gcp.endpoint.clone())
            .build()
            .into(),
    }
}

fn uuid_binary(id: KeyId) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.as_bytes().to_vec(),
    }
}

fn key_id_from_binary(binary: &Binary) -> Result<KeyId> {
    let bytes: [u8; 16] = binary.bytes.as_slice().try_into().map_err(|_| {
        StorageError::Backend(format!("key id has {} bytes, expected 16", binary.bytes.len()))
    })?;
    Ok(KeyId::from_bytes(bytes))
}

fn record_from_document(document: Document) -> Result<DataKeyRecord> {
    let malformed = |what: &str| StorageError::Backend(format!("malformed key document: {}", what));

    let id = match document.get("_id") {
        Some(Bson::Binary(binary)) => key_id_from_binary(binary)?,
        _ => return Err(malformed("_id").into()),
    };

    let key_alt_names = document
        .get_array(KEY_ALT_NAMES_FIELD)
        .map(|names| {
            names
                .iter()
                .filter_map(|name| name.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let master_key: MasterKeySpec = document
        .get_document("masterKey")
        .map_err(|_| malformed("masterKey"))
        .and_then(|doc| {
            mongodb::bson::from_document(doc.clone()).map_err(|e| malformed(&e.to_string()))
        })?;

    let created_at = document
        .get_datetime("creationDate")
        .ok()
        .and_then(|dt| chrono::DateTime::from_timestamp_millis(dt.timestamp_millis()))
        .unwrap_or_else(Utc::now);

    Ok(DataKeyRecord {
        id,
        key_alt_names,
        master_key,
        created_at,
    })
}

/// Relaxed extended JSON to a BSON document, turning `$binary` into binary.
fn to_document(json: serde_json::Value) -> Result<Document> {
    match Bson::try_from(json) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(StorageError::Backend(format!("schema is not a document: {}", other)).into()),
        Err(e) => Err(StorageError::Backend(format!("invalid schema: {}", e)).into()),
    }
}

/// Unique, partial on `keyAltNames` existing, over `keyAltNames` alone.
/// The name does not matter.
fn satisfies_shape(index: &IndexModel) -> bool {
    let keys = index.keys.len() == 1 && index.keys.get(KEY_ALT_NAMES_FIELD).is_some_and(is_one);
    let options = index.options.as_ref();
    let unique = options.and_then(|o| o.unique).unwrap_or(false);
    let partial = options
        .and_then(|o| o.partial_filter_expression.as_ref())
        .is_some_and(is_exists_filter);
    keys && unique && partial
}

fn is_one(value: &Bson) -> bool {
    match value {
        Bson::Int32(n) => *n == 1,
        Bson::Int64(n) => *n == 1,
        Bson::Double(n) => *n == 1.0,
        _ => false,
    }
}

fn is_exists_filter(filter: &Document) -> bool {
    filter.len() == 1
        && filter
            .get_document(KEY_ALT_NAMES_FIELD)
            .ok()
            .and_then(|condition| condition.get("$exists"))
            .is_some_and(|exists| matches!(exists, Bson::Boolean(true)) || is_one(exists))
}

/// What the vault needs to know about a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Connection,
    Encryption,
    Other,
}

/// Server error code and failure class of a driver error.
fn failure_of(err: &mongodb::error::Error) -> (Option<i32>, Failure) {
    let code = match *err.kind {
        ErrorKind::Command(ref command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(ref write)) => Some(write.code),
        ErrorKind::Write(WriteFailure::WriteConcernError(ref concern)) => Some(concern.code),
        ErrorKind::InsertMany(ref insert) => insert
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|write| write.code),
        _ => None,
    };

    let failure = match *err.kind {
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::Authentication { .. } => {
            Failure::Connection
        }
        ErrorKind::Encryption(_) => Failure::Encryption,
        _ => Failure::Other,
    };

    (code, failure)
}

fn is_index_conflict(code: Option<i32>) -> bool {
    matches!(code, Some(INDEX_OPTIONS_CONFLICT) | Some(INDEX_KEY_SPECS_CONFLICT))
}

fn storage_error(failure: Failure, message: String) -> Error {
    match failure {
        Failure::Connection => StorageError::ConnectionFailed(message).into(),
        Failure::Encryption | Failure::Other => StorageError::Backend(message).into(),
    }
}

fn index_error(code: Option<i32>, failure: Failure, message: String) -> Error {
    if is_index_conflict(code) {
        StorageError::IndexConflict(message).into()
    } else {
        storage_error(failure, message)
    }
}

fn create_error(
    code: Option<i32>,
    failure: Failure,
    message: String,
    provider: Provider,
    alt_name: &str,
) -> Error {
    if code == Some(DUPLICATE_KEY) {
        return StorageError::DuplicateKeyRace(alt_name.to_string()).into();
    }

    match failure {
        Failure::Encryption if looks_like_auth_failure(&message) => ProviderError::AuthFailure {
            provider,
            cause: message,
        }
        .into(),
        Failure::Encryption => ProviderError::Rejected {
            provider,
            cause: message,
        }
        .into(),
        _ => storage_error(failure, message),
    }
}

fn backend(err: mongodb::error::Error) -> Error {
    StorageError::Backend(err.to_string()).into()
}

fn classify_storage(err: &mongodb::error::Error) -> Error {
    let (_, failure) = failure_of(err);
    storage_error(failure, err.to_string())
}

fn classify_create(err: &mongodb::error::Error, provider: Provider, alt_name: &str) -> Error {
    let (code, failure) = failure_of(err);
    create_error(code, failure, err.to_string(), provider, alt_name)
}

/// KMS providers report credential problems as HTTP 401/403 with
/// provider-specific bodies.
fn looks_like_auth_failure(cause: &str) -> bool {
    const MARKERS: &[&str] = &[
        "401",
        "403",
        "Unauthorized",
        "AccessDenied",
        "UnrecognizedClient",
        "InvalidSignature",
        "invalid_client",
        "invalid_grant",
        "PERMISSION_DENIED",
        "UNAUTHENTICATED",
    ];
    MARKERS.iter().any(|marker| cause.contains(marker))
}
