//! Constants used throughout csfle.
//!
//! Centralizes default names, sizes, and driver strings.

/// Configuration file name (csfle.toml).
pub const CONFIG_FILE: &str = "csfle.toml";

/// Dotenv file layered beneath the process environment.
pub const ENV_FILE: &str = ".env";

/// Default location of the local master key.
pub const MASTER_KEY_FILE: &str = "master-key.txt";

/// Decoded length of a local master key (two 32-byte keys plus 32 reserved).
pub const LOCAL_MASTER_KEY_LEN: usize = 96;

/// Default connection string for the key vault.
pub const DEFAULT_CONNECTION_STRING: &str = "mongodb://localhost:27017";

/// Default key vault database and collection.
pub const DEFAULT_KEY_VAULT_DB: &str = "encryption";
pub const DEFAULT_KEY_VAULT_COLL: &str = "__keyVault";

/// Default alt name of the demo data key.
pub const DEFAULT_KEY_ALT_NAME: &str = "demo-data-key";

/// Default encrypted database and collection.
pub const DEFAULT_DATA_DB: &str = "medicalRecords";
pub const DEFAULT_DATA_COLL: &str = "patients";

/// Default timeout, in seconds, for KMS and key vault calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Field holding alt names in key vault documents.
pub const KEY_ALT_NAMES_FIELD: &str = "keyAltNames";

/// Name of the partial unique index over `keyAltNames`.
pub const KEY_ALT_NAMES_INDEX: &str = "keyAltNames_1";

/// Driver name of the deterministic algorithm.
pub const DETERMINISTIC_ALGORITHM: &str = "AEAD_AES_256_CBC_HMAC_SHA_512-Deterministic";

/// Driver name of the randomized algorithm.
pub const RANDOM_ALGORITHM: &str = "AEAD_AES_256_CBC_HMAC_SHA_512-Random";

/// Binary subtype for UUID key ids in schemas.
pub const UUID_SUBTYPE: &str = "04";

/// BSON types deterministic encryption cannot handle.
pub const DETERMINISTIC_UNSUPPORTED_TYPES: &[&str] = &[
    "double",
    "decimal",
    "bool",
    "object",
    "array",
    "javascriptWithScope",
];

/// Field rules of the patient demo, used when nothing else is configured.
pub const DEMO_FIELD_RULES: &[&str] = &[
    "ssn:int:Deterministic",
    "bloodType:string:Random",
    "medicalRecords:array:Random",
    "insurance.policyNumber:int:Deterministic",
];
