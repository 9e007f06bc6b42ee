//! Field encryption rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::core::constants::{DEMO_FIELD_RULES, DETERMINISTIC_ALGORITHM, RANDOM_ALGORITHM};
use crate::core::types::{BsonType, FieldPath};
use crate::error::SchemaError;

/// Field encryption algorithm.
///
/// Deterministic ciphertext is stable for a given plaintext, so the server
/// can match it in equality queries. Random ciphertext is not queryable but
/// leaks nothing about repeated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Deterministic,
    Random,
}

impl Algorithm {
    /// Name the driver expects in a schema.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Self::Deterministic => DETERMINISTIC_ALGORITHM,
            Self::Random => RANDOM_ALGORITHM,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deterministic => f.write_str("Deterministic"),
            Self::Random => f.write_str("Random"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = SchemaError;

    /// Accepts `Deterministic`/`Random` in any case, or the full driver name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("deterministic") || s == DETERMINISTIC_ALGORITHM {
            Ok(Self::Deterministic)
        } else if s.eq_ignore_ascii_case("random") || s == RANDOM_ALGORITHM {
            Ok(Self::Random)
        } else {
            Err(SchemaError::InvalidRule {
                rule: s.to_string(),
                reason: "algorithm must be Deterministic or Random".to_string(),
            })
        }
    }
}

impl Serialize for Algorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.driver_name())
    }
}

/// One encrypted field: `path:bsonType:Algorithm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldRule {
    pub path: FieldPath,
    pub bson_type: BsonType,
    pub algorithm: Algorithm,
}

impl FieldRule {
    pub fn new(path: impl Into<String>, bson_type: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            path: path.into(),
            bson_type: bson_type.into(),
            algorithm,
        }
    }

    /// Rules of the patient demo collection.
    pub fn demo() -> Vec<Self> {
        DEMO_FIELD_RULES
            .iter()
            .filter_map(|rule| rule.parse().ok())
            .collect()
    }

    /// The path split into its segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.bson_type, self.algorithm)
    }
}

impl FromStr for FieldRule {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SchemaError::InvalidRule {
            rule: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split(':').map(str::trim).collect();
        let [path, bson_type, algorithm] = parts.as_slice() else {
            return Err(invalid("expected path:bsonType:Algorithm"));
        };

        if path.is_empty() {
            return Err(invalid("empty field path"));
        }
        if bson_type.is_empty() {
            return Err(invalid("empty bsonType"));
        }

        Ok(Self::new(*path, *bson_type, algorithm.parse()?))
    }
}

impl TryFrom<String> for FieldRule {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldRule> for String {
    fn from(rule: FieldRule) -> Self {
        rule.to_string()
    }
}
