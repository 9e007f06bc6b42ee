//! Tests for `csfle schema`.

use crate::support::*;

#[test]
fn test_schema_for_patient_demo() {
    let t = Test::new();

    let output = t.schema(KEY_ID, &[]);
    assert_success(&output);

    let json = stdout_json(&output);
    let schema = &json["medicalRecords.patients"];
    assert_eq!(schema["bsonType"], "object");
    assert_eq!(schema["encryptMetadata"]["keyId"][0]["$binary"]["base64"], KEY_ID);
    assert_eq!(schema["encryptMetadata"]["keyId"][0]["$binary"]["subType"], "04");

    let props = &schema["properties"];
    assert_eq!(props["ssn"]["encrypt"]["algorithm"], DETERMINISTIC);
    assert_eq!(props["bloodType"]["encrypt"]["algorithm"], RANDOM);
    assert_eq!(props["medicalRecords"]["encrypt"]["bsonType"], "array");
    assert_eq!(
        props["insurance"]["properties"]["policyNumber"]["encrypt"]["algorithm"],
        DETERMINISTIC
    );
}

#[test]
fn test_schema_output_is_stable() {
    let t = Test::new();

    let first = t.schema(KEY_ID, &[]);
    let second = t.schema(KEY_UUID, &[]);
    assert_success(&first);
    assert_success(&second);
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_schema_fields_and_namespace_from_flags() {
    let t = Test::new();

    let output = t.schema(
        KEY_ID,
        &[
            "--namespace",
            "billing.invoices",
            "--field",
            "card.number:string:Deterministic",
            "--field",
            "amount:int:Random",
        ],
    );
    assert_success(&output);

    let json = stdout_json(&output);
    assert!(json.get("medicalRecords.patients").is_none());
    let props = &json["billing.invoices"]["properties"];
    assert_eq!(props["card"]["bsonType"], "object");
    assert_eq!(props["card"]["properties"]["number"]["encrypt"]["bsonType"], "string");
    assert_eq!(props["amount"]["encrypt"]["algorithm"], RANDOM);
    assert!(props.get("ssn").is_none());
}

#[test]
fn test_schema_uses_configured_rules() {
    let t = Test::new();
    t.write("csfle.toml", HR_CONFIG);

    let output = t.schema(KEY_ID, &[]);
    assert_success(&output);

    let json = stdout_json(&output);
    let props = &json["hr.employees"]["properties"];
    assert_eq!(props["badge"]["encrypt"]["algorithm"], DETERMINISTIC);
    assert_eq!(props["salary"]["encrypt"]["algorithm"], RANDOM);
}

#[test]
fn test_schema_written_to_file() {
    let t = Test::new();

    let output = t.schema(KEY_ID, &["--out", "schema.json"]);
    assert_success(&output);
    assert!(stdout(&output).is_empty());

    let json: serde_json::Value = serde_json::from_str(&t.read("schema.json")).unwrap();
    assert!(json.get("medicalRecords.patients").is_some());
}

#[test]
fn test_schema_rejects_conflicting_rules() {
    let t = Test::new();

    let output = t.schema(
        KEY_ID,
        &["--field", "ssn:int:Deterministic", "--field", "ssn:int:Random"],
    );
    assert_failure(&output);
    assert_stderr_contains(&output, "conflicting rules for 'ssn'");
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_schema_rejects_overlapping_rules() {
    let t = Test::new();

    let output = t.schema(
        KEY_ID,
        &[
            "--field",
            "insurance:object:Random",
            "--field",
            "insurance.policyNumber:int:Deterministic",
        ],
    );
    assert_failure(&output);
    assert_stderr_contains(&output, "'insurance' is encrypted as a whole");
}

#[test]
fn test_schema_rejects_deterministic_double() {
    let t = Test::new();

    let output = t.schema(KEY_ID, &["--field", "weight:double:Deterministic"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "does not support bsonType 'double'");
}

#[test]
fn test_schema_rejects_malformed_arguments() {
    let t = Test::new();

    let output = t.schema(KEY_ID, &["--field", "ssn:int"]);
    assert_eq!(output.status.code(), Some(2));
    assert_stderr_contains(&output, "expected path:bsonType:Algorithm");

    let output = t.schema("not-a-key", &[]);
    assert_eq!(output.status.code(), Some(2));
}
