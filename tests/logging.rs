//! Diagnostic logging goes to stderr and stays quiet by default.

mod support;

use support::*;

#[test]
fn test_quiet_by_default() {
    let t = Test::with_master_key();

    let output = t.data_key_dry_run(&[]);
    assert_success(&output);
    assert_stderr_excludes(&output, "DEBUG");
}

#[test]
fn test_verbose_flag_enables_debug() {
    let t = Test::with_master_key();

    let output = t
        .cmd()
        .args(["--verbose", "data-key", "--dry-run"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "DEBUG");
    assert_stderr_contains(&output, "resolving master key");
}

#[test]
fn test_log_env_var_sets_filter() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["schema", "--key-id", KEY_ID])
        .env("CSFLE_LOG", "csfle=debug")
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "building schema");

    // Logs never end up mixed into the data stream.
    let json = stdout_json(&output);
    assert!(json.get("medicalRecords.patients").is_some());
}

#[test]
fn test_secrets_are_not_logged() {
    let t = Test::new();
    t.write(".env", AWS_ENV);

    let output = t
        .cmd()
        .args(["data-key", "--dry-run", "--provider", "aws"])
        .env("CSFLE_LOG", "trace")
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "master key resolved");
    assert_stderr_excludes(&output, "wJalrXUtnFEMI");
}
