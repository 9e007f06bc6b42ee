//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

/// Provider variables that must not leak in from the developer's shell.
const PROVIDER_VARS: &[&str] = &[
    "FLE_AWS_ACCESS_KEY",
    "FLE_AWS_SECRET_ACCESS_KEY",
    "FLE_AWS_KEY_ARN",
    "FLE_AWS_KEY_REGION",
    "FLE_AWS_KEY_ENDPOINT",
    "FLE_AZURE_TENANT_ID",
    "FLE_AZURE_CLIENT_ID",
    "FLE_AZURE_CLIENT_SECRET",
    "FLE_AZURE_KEYVAULT_ENDPOINT",
    "FLE_AZURE_KEY_NAME",
    "FLE_AZURE_IDENTITY_PLATFORM_ENDPOINT",
    "FLE_AZURE_KEY_VERSION",
    "FLE_GCP_EMAIL",
    "FLE_GCP_PRIVATE_KEY",
    "FLE_GCP_PROJ_ID",
    "FLE_GCP_LOCATION",
    "FLE_GCP_KEY_RING",
    "FLE_GCP_KEY_NAME",
    "FLE_GCP_CRED_ENDPOINT",
    "FLE_GCP_KEY_ENDPOINT",
    "FLE_GCP_KEY_VERSION",
];

impl Test {
    /// Create a csfle command running in the test directory.
    ///
    /// Colors are off and provider variables are cleared so output is stable.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("csfle").expect("failed to find csfle binary");
        cmd.current_dir(self.dir.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("CSFLE_LOG");
        for var in PROVIDER_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Shortcut for `csfle master-key`.
    pub fn master_key(&self) -> Output {
        self.cmd()
            .arg("master-key")
            .output()
            .expect("failed to run csfle master-key")
    }

    /// Shortcut for `csfle data-key --dry-run`.
    pub fn data_key_dry_run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(["data-key", "--dry-run"])
            .args(args)
            .output()
            .expect("failed to run csfle data-key")
    }

    /// Shortcut for `csfle schema --key-id <id>`.
    pub fn schema(&self, key_id: &str, args: &[&str]) -> Output {
        self.cmd()
            .args(["schema", "--key-id", key_id])
            .args(args)
            .output()
            .expect("failed to run csfle schema")
    }
}
