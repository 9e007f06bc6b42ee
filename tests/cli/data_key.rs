//! Tests for `csfle data-key`.
//!
//! Uses `--dry-run` so no database is needed.

use crate::support::*;

#[test]
fn test_data_key_prints_key_id() {
    let t = Test::with_master_key();

    let output = t.data_key_dry_run(&[]);
    assert_success(&output);
    assert_stderr_contains(&output, "created data key 'demo-data-key'");
    assert_stderr_contains(&output, "provider:  local");

    let id = stdout(&output);
    let id = id.trim();
    assert_eq!(id.len(), 24, "unexpected key id: {}", id);
    assert!(id.ends_with("=="));
}

#[test]
fn test_data_key_custom_alt_name() {
    let t = Test::with_master_key();

    let output = t.data_key_dry_run(&["--alt-name", "billing"]);
    assert_success(&output);
    assert_stderr_contains(&output, "'billing'");
}

#[test]
fn test_data_key_alt_name_from_config() {
    let t = Test::with_master_key();
    t.write("csfle.toml", HR_CONFIG);

    let output = t.data_key_dry_run(&[]);
    assert_success(&output);
    assert_stderr_contains(&output, "'hr-key'");
}

#[test]
fn test_data_key_empty_alt_name_fails() {
    let t = Test::with_master_key();

    let output = t.data_key_dry_run(&["--alt-name", ""]);
    assert_failure(&output);
    assert_stderr_contains(&output, "key_alt_name");
}

#[test]
fn test_data_key_without_master_key() {
    let t = Test::new();

    let output = t.data_key_dry_run(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "master key not found at master-key.txt");
    assert_stderr_contains(&output, "csfle master-key");
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_data_key_with_corrupt_master_key() {
    let t = Test::new();
    t.write("master-key.txt", "AAAA");

    let output = t.data_key_dry_run(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "not usable");
    assert_stderr_contains(&output, "decoded 3");
    assert_stderr_contains(&output, "--force");
}

#[test]
fn test_data_key_zero_master_key() {
    let t = Test::new();
    t.write("master-key.txt", ZERO_MASTER_KEY);

    let output = t.data_key_dry_run(&["--alt-name", "demo"]);
    assert_success(&output);
}

#[test]
fn test_data_key_aws_reports_every_missing_variable() {
    let t = Test::new();

    let output = t.data_key_dry_run(&["--provider", "aws"]);
    assert_failure(&output);
    assert_stderr_contains(
        &output,
        "missing required aws configuration: FLE_AWS_ACCESS_KEY, FLE_AWS_SECRET_ACCESS_KEY, FLE_AWS_KEY_ARN, FLE_AWS_KEY_REGION",
    );
    assert_stderr_excludes(&output, "FLE_AWS_KEY_ENDPOINT");
}

#[test]
fn test_data_key_aws_names_only_missing_variables() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["data-key", "--dry-run", "--provider", "aws"])
        .env("FLE_AWS_ACCESS_KEY", "AKIAEXAMPLE")
        .env("FLE_AWS_KEY_REGION", "us-east-1")
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(
        &output,
        "missing required aws configuration: FLE_AWS_SECRET_ACCESS_KEY, FLE_AWS_KEY_ARN",
    );
}

#[test]
fn test_data_key_aws_from_env_file() {
    let t = Test::new();
    t.write(".env", AWS_ENV);

    let output = t.data_key_dry_run(&["--provider", "aws"]);
    assert_success(&output);
    assert_stderr_contains(&output, "provider:  aws");
}

#[test]
fn test_data_key_custom_env_file() {
    let t = Test::new();
    t.write("aws.env", AWS_ENV);

    let output = t
        .cmd()
        .args(["--env-file", "aws.env", "data-key", "--dry-run", "--provider", "aws"])
        .output()
        .unwrap();
    assert_success(&output);
}

#[test]
fn test_data_key_empty_process_value_falls_back_to_env_file() {
    let t = Test::new();
    t.write(".env", AWS_ENV);

    let output = t
        .cmd()
        .args(["data-key", "--dry-run", "--provider", "aws"])
        .env("FLE_AWS_KEY_REGION", "")
        .output()
        .unwrap();
    assert_success(&output);
}

#[test]
fn test_data_key_gcp_reports_missing_variables() {
    let t = Test::new();

    let output = t.data_key_dry_run(&["--provider", "gcp"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "FLE_GCP_EMAIL, FLE_GCP_PRIVATE_KEY, FLE_GCP_PROJ_ID");
    assert_stderr_contains(&output, "set the listed variables");
}

#[test]
fn test_data_key_azure_reports_missing_variables() {
    let t = Test::new();

    let output = t.data_key_dry_run(&["--provider", "azure"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "FLE_AZURE_TENANT_ID");
    assert_stderr_contains(&output, "FLE_AZURE_KEY_NAME");
    assert_stderr_excludes(&output, "FLE_AZURE_KEY_VERSION");
}

#[cfg(not(feature = "mongo"))]
#[test]
fn test_data_key_needs_a_vault_backend() {
    let t = Test::with_master_key();

    let output = t.cmd().arg("data-key").output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "no key vault backend available");
    assert_stderr_contains(&output, "--dry-run");
}

#[cfg(not(feature = "mongo"))]
#[test]
fn test_data_key_config_errors_come_first() {
    let t = Test::new();

    let output = t.cmd().arg("data-key").output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "master key not found");
    assert_stderr_excludes(&output, "backend");
}
