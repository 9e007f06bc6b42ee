//! Azure Key Vault master key.
//!
//! ## Variables
//!
//! | Name | Required |
//! |---|---|
//! | `FLE_AZURE_TENANT_ID` | yes |
//! | `FLE_AZURE_CLIENT_ID` | yes |
//! | `FLE_AZURE_CLIENT_SECRET` | yes |
//! | `FLE_AZURE_KEYVAULT_ENDPOINT` | yes, typically `<vault>.vault.azure.net` |
//! | `FLE_AZURE_KEY_NAME` | yes |
//! | `FLE_AZURE_IDENTITY_PLATFORM_ENDPOINT` | no, for non-commercial clouds |
//! | `FLE_AZURE_KEY_VERSION` | no, defaults to the primary version |

use serde::{Deserialize, Serialize};

use super::{Fields, Provider, Secret};
use crate::core::env::EnvSource;
use crate::core::types::VarName;
use crate::error::Result;

pub const TENANT_ID: VarName = "FLE_AZURE_TENANT_ID";
pub const CLIENT_ID: VarName = "FLE_AZURE_CLIENT_ID";
pub const CLIENT_SECRET: VarName = "FLE_AZURE_CLIENT_SECRET";
pub const KEYVAULT_ENDPOINT: VarName = "FLE_AZURE_KEYVAULT_ENDPOINT";
pub const KEY_NAME: VarName = "FLE_AZURE_KEY_NAME";
pub const IDENTITY_PLATFORM_ENDPOINT: VarName = "FLE_AZURE_IDENTITY_PLATFORM_ENDPOINT";
pub const KEY_VERSION: VarName = "FLE_AZURE_KEY_VERSION";

/// Service principal credentials handed to the driver.
#[derive(Debug, Clone)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Secret,
    pub identity_platform_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMasterKey {
    pub key_vault_endpoint: String,
    pub key_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AzureKms {
    pub credentials: AzureCredentials,
    pub master_key: AzureMasterKey,
}

pub(crate) fn resolve(env: &dyn EnvSource) -> Result<AzureKms> {
    let mut fields = Fields::new(Provider::Azure, env);

    let tenant_id = fields.required(TENANT_ID);
    let client_id = fields.required(CLIENT_ID);
    let client_secret = fields.required(CLIENT_SECRET);
    let key_vault_endpoint = fields.required(KEYVAULT_ENDPOINT);
    let key_name = fields.required(KEY_NAME);
    let identity_platform_endpoint = fields.optional(IDENTITY_PLATFORM_ENDPOINT);
    let key_version = fields.optional(KEY_VERSION);
    fields.finish()?;

    Ok(AzureKms {
        credentials: AzureCredentials {
            tenant_id,
            client_id,
            client_secret: Secret::new(client_secret),
            identity_platform_endpoint,
        },
        master_key: AzureMasterKey {
            key_vault_endpoint,
            key_name,
            key_version,
        },
    })
}
