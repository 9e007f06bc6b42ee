//! AWS KMS master key.
//!
//! ## Variables
//!
//! | Name | Required |
//! |---|---|
//! | `FLE_AWS_ACCESS_KEY` | yes |
//! | `FLE_AWS_SECRET_ACCESS_KEY` | yes |
//! | `FLE_AWS_KEY_ARN` | yes |
//! | `FLE_AWS_KEY_REGION` | yes |
//! | `FLE_AWS_KEY_ENDPOINT` | no, defaults to `kms.<region>.amazonaws.com` |

use serde::{Deserialize, Serialize};

use super::{Fields, Provider, Secret};
use crate::core::env::EnvSource;
use crate::core::types::VarName;
use crate::error::Result;

pub const ACCESS_KEY: VarName = "FLE_AWS_ACCESS_KEY";
pub const SECRET_ACCESS_KEY: VarName = "FLE_AWS_SECRET_ACCESS_KEY";
pub const KEY_ARN: VarName = "FLE_AWS_KEY_ARN";
pub const KEY_REGION: VarName = "FLE_AWS_KEY_REGION";
pub const KEY_ENDPOINT: VarName = "FLE_AWS_KEY_ENDPOINT";

/// IAM credentials handed to the driver.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: Secret,
}

/// Location of the customer master key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsMasterKey {
    pub region: String,
    /// Key ARN, e.g. `arn:aws:kms:us-east-2:111122223333:alias/test-key`.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AwsKms {
    pub credentials: AwsCredentials,
    pub master_key: AwsMasterKey,
}

pub(crate) fn resolve(env: &dyn EnvSource) -> Result<AwsKms> {
    let mut fields = Fields::new(Provider::Aws, env);

    let access_key_id = fields.required(ACCESS_KEY);
    let secret_access_key = fields.required(SECRET_ACCESS_KEY);
    let key = fields.required(KEY_ARN);
    let region = fields.required(KEY_REGION);
    let endpoint = fields.optional(KEY_ENDPOINT);
    fields.finish()?;

    Ok(AwsKms {
        credentials: AwsCredentials {
            access_key_id,
            secret_access_key: Secret::new(secret_access_key),
        },
        master_key: AwsMasterKey {
            region,
            key,
            endpoint,
        },
    })
}
