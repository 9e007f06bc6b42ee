//! Tests for `csfle master-key`.

use base64::Engine;

use crate::support::*;

fn decoded_len(text: &str) -> usize {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .expect("key file is not base64")
        .len()
}

#[test]
fn test_master_key_writes_96_bytes() {
    let t = Test::new();

    let output = t.master_key();
    assert_success(&output);
    assert_stderr_contains(&output, "master key written to master-key.txt");
    assert_stderr_contains(&output, "fingerprint:");
    assert_stdout_contains(&output, "master-key.txt");

    assert_eq!(decoded_len(&t.read("master-key.txt")), 96);
}

#[test]
fn test_master_key_refuses_to_overwrite() {
    let t = Test::with_master_key();
    let before = t.read("master-key.txt");

    let output = t.master_key();
    assert_failure(&output);
    assert_stderr_contains(&output, "already exists");
    assert_stderr_contains(&output, "--force");

    assert_eq!(t.read("master-key.txt"), before);
}

#[test]
fn test_master_key_force_replaces_key() {
    let t = Test::with_master_key();
    let before = t.read("master-key.txt");

    let output = t.cmd().args(["master-key", "--force"]).output().unwrap();
    assert_success(&output);

    let after = t.read("master-key.txt");
    assert_ne!(after, before);
    assert_eq!(decoded_len(&after), 96);
}

#[test]
fn test_master_key_custom_path() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["master-key", "--out", "keys/local.key"])
        .output()
        .unwrap();
    assert_success(&output);

    assert_eq!(decoded_len(&t.read("keys/local.key")), 96);
    assert!(!t.path("master-key.txt").exists());
}

#[test]
fn test_master_key_path_from_config() {
    let t = Test::new();
    t.write("csfle.toml", "[kms]\nmaster_key_path = \"secrets/mk.txt\"\n");

    let output = t.master_key();
    assert_success(&output);
    assert!(t.path("secrets/mk.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_master_key_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let t = Test::with_master_key();
    let mode = std::fs::metadata(t.path("master-key.txt"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}
