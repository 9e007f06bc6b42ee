//! Type aliases for domain concepts.

/// A key alt name (e.g. `demo-data-key`).
///
/// Unique within a key vault namespace.
pub type AltName = String;

/// A dotted field path inside a document (e.g. `insurance.policyNumber`).
pub type FieldPath = String;

/// A BSON type alias as understood by the schema validator (`int`, `string`, ...).
pub type BsonType = String;

/// An environment variable name.
pub type VarName = &'static str;
