//! Google Cloud KMS master key.
//!
//! ## Variables
//!
//! | Name | Required |
//! |---|---|
//! | `FLE_GCP_EMAIL` | yes, service account email |
//! | `FLE_GCP_PRIVATE_KEY` | yes, base64 service account key |
//! | `FLE_GCP_PROJ_ID` | yes |
//! | `FLE_GCP_LOCATION` | yes, e.g. `global` |
//! | `FLE_GCP_KEY_RING` | yes |
//! | `FLE_GCP_KEY_NAME` | yes |
//! | `FLE_GCP_CRED_ENDPOINT` | no, defaults to `oauth2.googleapis.com` |
//! | `FLE_GCP_KEY_ENDPOINT` | no, defaults to `cloudkms.googleapis.com` |
//! | `FLE_GCP_KEY_VERSION` | no, defaults to the primary version |

use serde::{Deserialize, Serialize};

use super::{Fields, Provider, Secret};
use crate::core::env::EnvSource;
use crate::core::types::VarName;
use crate::error::Result;

pub const EMAIL: VarName = "FLE_GCP_EMAIL";
pub const PRIVATE_KEY: VarName = "FLE_GCP_PRIVATE_KEY";
pub const PROJECT_ID: VarName = "FLE_GCP_PROJ_ID";
pub const LOCATION: VarName = "FLE_GCP_LOCATION";
pub const KEY_RING: VarName = "FLE_GCP_KEY_RING";
pub const KEY_NAME: VarName = "FLE_GCP_KEY_NAME";
pub const CRED_ENDPOINT: VarName = "FLE_GCP_CRED_ENDPOINT";
pub const KEY_ENDPOINT: VarName = "FLE_GCP_KEY_ENDPOINT";
pub const KEY_VERSION: VarName = "FLE_GCP_KEY_VERSION";

/// Service account credentials handed to the driver.
#[derive(Debug, Clone)]
pub struct GcpCredentials {
    pub email: String,
    pub private_key: Secret,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpMasterKey {
    pub project_id: String,
    pub location: String,
    pub key_ring: String,
    pub key_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GcpKms {
    pub credentials: GcpCredentials,
    pub master_key: GcpMasterKey,
}

pub(crate) fn resolve(env: &dyn EnvSource) -> Result<GcpKms> {
    let mut fields = Fields::new(Provider::Gcp, env);

    let email = fields.required(EMAIL);
    let private_key = fields.required(PRIVATE_KEY);
    let project_id = fields.required(PROJECT_ID);
    let location = fields.required(LOCATION);
    let key_ring = fields.required(KEY_RING);
    let key_name = fields.required(KEY_NAME);
    let cred_endpoint = fields.optional(CRED_ENDPOINT);
    let key_endpoint = fields.optional(KEY_ENDPOINT);
    let key_version = fields.optional(KEY_VERSION);
    fields.finish()?;

    Ok(GcpKms {
        credentials: GcpCredentials {
            email,
            private_key: Secret::new(private_key),
            endpoint: cred_endpoint,
        },
        master_key: GcpMasterKey {
            project_id,
            location,
            key_ring,
            key_name,
            key_version,
            endpoint: key_endpoint,
        },
    })
}
