//! Master key resolution.
//!
//! Resolves the envelope master key for one KMS provider:
//!
//! - **local**: 96 secret bytes read from a base64 file
//! - **aws**: IAM credentials plus a key ARN and region
//! - **azure**: service principal plus a Key Vault key
//! - **gcp**: service account plus a key ring location
//!
//! Cloud values are read from named variables (see each provider module).
//! Every missing required value is reported in one error. Nothing here
//! talks to the network or keeps material beyond the returned value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::config::KmsSettings;
use crate::core::env::EnvSource;
use crate::core::types::VarName;
use crate::error::{ConfigError, Result};

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod local;

pub use aws::{AwsCredentials, AwsKms, AwsMasterKey};
pub use azure::{AzureCredentials, AzureKms, AzureMasterKey};
pub use gcp::{GcpCredentials, GcpKms, GcpMasterKey};
pub use local::LocalKey;

/// Supported KMS providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Local,
    Aws,
    Azure,
    Gcp,
}

impl Provider {
    /// All providers, in display order.
    pub const ALL: [Provider; 4] = [Self::Local, Self::Aws, Self::Azure, Self::Gcp];

    /// Driver name of the provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "provider",
                reason: format!("unknown provider '{}' (expected local, aws, azure or gcp)", s),
            })
    }
}

/// A secret string that is wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    /// Borrow the secret value.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Master key material for one provider.
///
/// Immutable once resolved. `Debug` never shows secret fields.
#[derive(Debug, Clone)]
pub enum MasterKeyMaterial {
    Local(LocalKey),
    Aws(AwsKms),
    Azure(AzureKms),
    Gcp(GcpKms),
}

impl MasterKeyMaterial {
    /// Provider this material belongs to.
    pub fn provider(&self) -> Provider {
        match self {
            Self::Local(_) => Provider::Local,
            Self::Aws(_) => Provider::Aws,
            Self::Azure(_) => Provider::Azure,
            Self::Gcp(_) => Provider::Gcp,
        }
    }

    /// Where the provider keeps the master key. Contains no secrets.
    pub fn key_spec(&self) -> MasterKeySpec {
        match self {
            Self::Local(_) => MasterKeySpec::Local,
            Self::Aws(aws) => MasterKeySpec::Aws(aws.master_key.clone()),
            Self::Azure(azure) => MasterKeySpec::Azure(azure.master_key.clone()),
            Self::Gcp(gcp) => MasterKeySpec::Gcp(gcp.master_key.clone()),
        }
    }

    /// Short SHA-256 fingerprint, safe to display.
    ///
    /// Local keys hash the key bytes; cloud providers hash the key location.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.provider().name().as_bytes());
        match self {
            Self::Local(key) => hasher.update(key.as_bytes()),
            Self::Aws(aws) => hasher.update(aws.master_key.key.as_bytes()),
            Self::Azure(azure) => {
                hasher.update(azure.master_key.key_vault_endpoint.as_bytes());
                hasher.update(azure.master_key.key_name.as_bytes());
            }
            Self::Gcp(gcp) => {
                hasher.update(gcp.master_key.project_id.as_bytes());
                hasher.update(gcp.master_key.key_ring.as_bytes());
                hasher.update(gcp.master_key.key_name.as_bytes());
            }
        }
        hasher.finalize()[..8]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Provider-specific location of the master key used to wrap a data key.
///
/// Serialises with the driver's field names, tagged by provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum MasterKeySpec {
    Local,
    Aws(AwsMasterKey),
    Azure(AzureMasterKey),
    Gcp(GcpMasterKey),
}

impl MasterKeySpec {
    pub fn provider(&self) -> Provider {
        match self {
            Self::Local => Provider::Local,
            Self::Aws(_) => Provider::Aws,
            Self::Azure(_) => Provider::Azure,
            Self::Gcp(_) => Provider::Gcp,
        }
    }
}

/// Resolve master key material for a provider.
///
/// # Errors
///
/// - `ConfigError::MissingSecret` / `InvalidEncoding` for an unusable local key file
/// - `ConfigError::MissingField` naming every absent required value
pub fn resolve(
    provider: Provider,
    settings: &KmsSettings,
    env: &dyn EnvSource,
) -> Result<MasterKeyMaterial> {
    debug!(%provider, "resolving master key");

    let material = match provider {
        Provider::Local => MasterKeyMaterial::Local(LocalKey::read(&settings.master_key_path)?),
        Provider::Aws => MasterKeyMaterial::Aws(aws::resolve(env)?),
        Provider::Azure => MasterKeyMaterial::Azure(azure::resolve(env)?),
        Provider::Gcp => MasterKeyMaterial::Gcp(gcp::resolve(env)?),
    };

    debug!(%provider, fingerprint = %material.fingerprint(), "master key resolved");
    Ok(material)
}

/// Collects named values for one provider, remembering every missing one.
pub(crate) struct Fields<'a> {
    provider: Provider,
    env: &'a dyn EnvSource,
    missing: Vec<VarName>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(provider: Provider, env: &'a dyn EnvSource) -> Self {
        Self {
            provider,
            env,
            missing: Vec::new(),
        }
    }

    /// Read a required value. Absent values are recorded and yield an empty string.
    pub(crate) fn required(&mut self, name: VarName) -> String {
        match self.env.var(name) {
            Some(value) => value,
            None => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    pub(crate) fn optional(&self, name: VarName) -> Option<String> {
        self.env.var(name)
    }

    /// Fail with every missing required value, if any.
    pub(crate) fn finish(self) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingField {
                provider: self.provider,
                fields: self.missing,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_provider_parse() {
        assert_eq!("aws".parse::<Provider>().unwrap(), Provider::Aws);
        assert_eq!("AZURE".parse::<Provider>().unwrap(), Provider::Azure);
        assert_eq!(" gcp ".parse::<Provider>().unwrap(), Provider::Gcp);
        assert_eq!("local".parse::<Provider>().unwrap(), Provider::Local);
        assert!("kmip".parse::<Provider>().is_err());
        assert!("".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_display_roundtrip() {
        for provider in Provider::ALL {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_fields_collects_all_missing() {
        let env: HashMap<String, String> =
            [("B".to_string(), "b".to_string())].into_iter().collect();
        let mut fields = Fields::new(Provider::Aws, &env);
        assert_eq!(fields.required("A"), "");
        assert_eq!(fields.required("B"), "b");
        assert_eq!(fields.required("C"), "");
        assert_eq!(fields.optional("D"), None);

        match fields.finish() {
            Err(crate::error::Error::Config(ConfigError::MissingField { provider, fields })) => {
                assert_eq!(provider, Provider::Aws);
                assert_eq!(fields, vec!["A", "C"]);
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2".to_string());
        assert_eq!(secret.expose(), "hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }

    #[test]
    fn test_key_spec_serializes_with_driver_names() {
        let spec = MasterKeySpec::Aws(AwsMasterKey {
            region: "us-east-1".to_string(),
            key: "arn:aws:kms:us-east-1:123:key/abc".to_string(),
            endpoint: None,
        });
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["provider"], "aws");
        assert_eq!(json["region"], "us-east-1");
        assert_eq!(json["key"], "arn:aws:kms:us-east-1:123:key/abc");
        assert!(json.get("endpoint").is_none());
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let material = MasterKeyMaterial::Local(LocalKey::from_bytes(vec![0; 96]).unwrap());
        let a = material.fingerprint();
        let b = material.clone().fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let other = MasterKeyMaterial::Local(LocalKey::from_bytes(vec![1; 96]).unwrap());
        assert_ne!(a, other.fingerprint());
    }
}
