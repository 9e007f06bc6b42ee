//! Test fixtures and constants.

/// Base64 of 96 zero bytes, a valid local master key.
pub const ZERO_MASTER_KEY: &str =
    "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// A fixed data key id (16 bytes of 0x11), base64.
pub const KEY_ID: &str = "EREREREREREREREREREREQ==";

/// The same key id in UUID form.
pub const KEY_UUID: &str = "11111111-1111-1111-1111-111111111111";

/// Driver names of the two algorithms.
pub const DETERMINISTIC: &str = "AEAD_AES_256_CBC_HMAC_SHA_512-Deterministic";
pub const RANDOM: &str = "AEAD_AES_256_CBC_HMAC_SHA_512-Random";

/// Complete AWS settings as a .env file.
pub const AWS_ENV: &str = r#"
# aws test account
FLE_AWS_ACCESS_KEY=AKIAEXAMPLE
FLE_AWS_SECRET_ACCESS_KEY="wJalrXUtnFEMI/K7MDENG"
FLE_AWS_KEY_ARN=arn:aws:kms:us-east-1:123456789012:key/abcd
export FLE_AWS_KEY_REGION=us-east-1
"#;

/// A config selecting the HR collection with two rules.
pub const HR_CONFIG: &str = r#"
[vault]
key_alt_name = "hr-key"

[schema]
namespace = "hr.employees"
fields = ["salary:int:Random", "badge:string:Deterministic"]
"#;
