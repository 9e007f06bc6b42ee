//! Tests for error reporting and global flags.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_malformed_config_is_reported() {
    let t = Test::new();
    t.write("csfle.toml", "[vault\n");

    let output = t.schema(KEY_ID, &[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse config");
}

#[test]
fn test_unknown_provider_in_config() {
    let t = Test::new();
    t.write("csfle.toml", "[kms]\nprovider = \"kmip\"\n");

    let output = t.master_key();
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse config");
}

#[test]
fn test_unknown_provider_flag() {
    let t = Test::new();

    let output = t.data_key_dry_run(&["--provider", "kmip"]);
    assert_eq!(output.status.code(), Some(2));
    assert_stderr_contains(&output, "unknown provider 'kmip'");
}

#[test]
fn test_key_vault_cannot_hold_data() {
    let t = Test::new();
    t.write(
        "csfle.toml",
        "[vault]\nnamespace = \"app.keys\"\n\n[schema]\nnamespace = \"app.keys\"\n",
    );

    let output = t.schema(KEY_ID, &[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "is the key vault");
}

#[test]
fn test_config_flag_selects_file() {
    let t = Test::new();
    t.write("hr.toml", HR_CONFIG);

    let output = t
        .cmd()
        .args(["--config", "hr.toml", "schema", "--key-id", KEY_ID])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(stdout_json(&output).get("hr.employees").is_some());
}

#[test]
fn test_completions_ignore_broken_config() {
    let t = Test::new();
    t.write("csfle.toml", "not toml at all [");

    t.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_csfle"));
}

#[test]
fn test_help_lists_commands() {
    Test::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("master-key"))
        .stdout(predicate::str::contains("data-key"))
        .stdout(predicate::str::contains("schema"));
}

#[test]
fn test_missing_subcommand_is_a_usage_error() {
    Test::new()
        .cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}
