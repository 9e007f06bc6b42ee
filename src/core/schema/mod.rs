//! Field-level encryption schemas.
//!
//! Turns a data key id and a list of [`FieldRule`]s into the schema map an
//! auto-encrypting client is configured with:
//!
//! ```json
//! {
//!   "medicalRecords.patients": {
//!     "bsonType": "object",
//!     "encryptMetadata": { "keyId": [ { "$binary": { "base64": "...", "subType": "04" } } ] },
//!     "properties": {
//!       "insurance": {
//!         "bsonType": "object",
//!         "properties": {
//!           "policyNumber": { "encrypt": { "bsonType": "int", "algorithm": "AEAD_AES_256_CBC_HMAC_SHA_512-Deterministic" } }
//!         }
//!       },
//!       "ssn": { "encrypt": { "bsonType": "int", "algorithm": "AEAD_AES_256_CBC_HMAC_SHA_512-Deterministic" } }
//!     }
//!   }
//! }
//! ```
//!
//! Building is pure. Properties live in sorted maps, so identical inputs
//! always serialise to identical bytes.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::core::constants::{DETERMINISTIC_UNSUPPORTED_TYPES, UUID_SUBTYPE};
use crate::core::namespace::Namespace;
use crate::core::vault::KeyId;
use crate::error::{Result, SchemaError};

mod rule;

pub use rule::{Algorithm, FieldRule};

const OBJECT: &str = "object";

/// Encryption schema for one collection, bound to one data key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDocument {
    #[serde(rename = "bsonType")]
    bson_type: &'static str,
    #[serde(rename = "encryptMetadata")]
    encrypt_metadata: EncryptMetadata,
    properties: BTreeMap<String, SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct EncryptMetadata {
    #[serde(rename = "keyId")]
    key_id: [KeyRef; 1],
}

/// Key id rendered as extended JSON binary, subtype 04.
#[derive(Debug, Clone, PartialEq)]
struct KeyRef(KeyId);

impl Serialize for KeyRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut binary = BTreeMap::new();
        binary.insert("base64", self.0.to_base64());
        binary.insert("subType", UUID_SUBTYPE.to_string());

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$binary", &binary)?;
        map.end()
    }
}

/// A property in the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaNode {
    /// Leaf: the whole value is encrypted.
    Encrypt { encrypt: EncryptDirective },
    /// Sub-document whose own properties carry rules.
    Object {
        #[serde(rename = "bsonType")]
        bson_type: &'static str,
        properties: BTreeMap<String, SchemaNode>,
    },
}

/// How a single field is encrypted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncryptDirective {
    #[serde(rename = "bsonType")]
    pub bson_type: String,
    pub algorithm: Algorithm,
}

impl SchemaDocument {
    /// Data key every field in this schema is encrypted with.
    pub fn key_id(&self) -> KeyId {
        self.encrypt_metadata.key_id[0].0
    }

    /// Top-level properties.
    pub fn properties(&self) -> &BTreeMap<String, SchemaNode> {
        &self.properties
    }

    /// Directive for a dotted path, if that path is encrypted.
    pub fn directive(&self, path: &str) -> Option<&EncryptDirective> {
        let mut properties = &self.properties;
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            match (properties.get(segment)?, segments.peek()) {
                (SchemaNode::Encrypt { encrypt }, None) => return Some(encrypt),
                (SchemaNode::Object { properties: inner, .. }, Some(_)) => properties = inner,
                _ => return None,
            }
        }
        None
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Schemas keyed by fully qualified collection name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SchemaMap(BTreeMap<String, SchemaDocument>);

impl SchemaMap {
    pub fn get(&self, namespace: &Namespace) -> Option<&SchemaDocument> {
        self.0.get(&namespace.to_string())
    }

    pub fn insert(&mut self, namespace: &Namespace, schema: SchemaDocument) {
        self.0.insert(namespace.to_string(), schema);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaDocument)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Pretty JSON, stable across runs for the same input.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds [`SchemaDocument`]s from field rules.
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Build the schema map for one collection.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::build_document`].
    pub fn build(key_id: KeyId, namespace: &Namespace, rules: &[FieldRule]) -> Result<SchemaMap> {
        let mut map = SchemaMap::default();
        map.insert(namespace, Self::build_document(key_id, rules)?);
        debug!(%namespace, %key_id, fields = rules.len(), "schema built");
        Ok(map)
    }

    /// Build a single schema document.
    ///
    /// # Errors
    ///
    /// - `SchemaError::InvalidPath` for empty path segments
    /// - `SchemaError::UnsupportedType` for deterministic encryption of a type the driver rejects
    /// - `SchemaError::ConflictingRule` when one path gets two different rules
    /// - `SchemaError::OverlappingPath` when an encrypted field also has rules below it
    pub fn build_document(key_id: KeyId, rules: &[FieldRule]) -> Result<SchemaDocument> {
        let rules = Self::normalize(rules)?;

        let mut properties = BTreeMap::new();
        for rule in rules.values() {
            Self::insert(&mut properties, rule)?;
        }

        Ok(SchemaDocument {
            bson_type: OBJECT,
            encrypt_metadata: EncryptMetadata {
                key_id: [KeyRef(key_id)],
            },
            properties,
        })
    }

    /// Validate rules and collapse exact duplicates, keyed by path.
    fn normalize(rules: &[FieldRule]) -> std::result::Result<BTreeMap<&str, &FieldRule>, SchemaError> {
        let mut by_path: BTreeMap<&str, &FieldRule> = BTreeMap::new();

        for rule in rules {
            if rule.segments().any(str::is_empty) {
                return Err(SchemaError::InvalidPath(rule.path.clone()));
            }

            if rule.algorithm == Algorithm::Deterministic
                && DETERMINISTIC_UNSUPPORTED_TYPES.contains(&rule.bson_type.as_str())
            {
                return Err(SchemaError::UnsupportedType {
                    path: rule.path.clone(),
                    bson_type: rule.bson_type.clone(),
                });
            }

            match by_path.get(rule.path.as_str()) {
                Some(existing) if *existing != rule => {
                    return Err(SchemaError::ConflictingRule {
                        path: rule.path.clone(),
                        first: format!("{}:{}", existing.bson_type, existing.algorithm),
                        second: format!("{}:{}", rule.bson_type, rule.algorithm),
                    });
                }
                Some(_) => {}
                None => {
                    by_path.insert(rule.path.as_str(), rule);
                }
            }
        }

        // Keys sharing a prefix are contiguous in sorted order.
        for parent in by_path.keys() {
            let prefix = format!("{}.", parent);
            if let Some(child) = by_path
                .range::<str, _>((std::ops::Bound::Excluded(*parent), std::ops::Bound::Unbounded))
                .map(|(path, _)| *path)
                .take_while(|path| path.starts_with(parent))
                .find(|path| path.starts_with(&prefix))
            {
                return Err(SchemaError::OverlappingPath {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
        }

        Ok(by_path)
    }

    fn insert(
        properties: &mut BTreeMap<String, SchemaNode>,
        rule: &FieldRule,
    ) -> std::result::Result<(), SchemaError> {
        let segments: Vec<&str> = rule.segments().collect();
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return Err(SchemaError::InvalidPath(rule.path.clone())),
        };

        let mut current = properties;
        for (depth, segment) in parents.iter().enumerate() {
            let node = current
                .entry(segment.to_string())
                .or_insert_with(|| SchemaNode::Object {
                    bson_type: OBJECT,
                    properties: BTreeMap::new(),
                });
            current = match node {
                SchemaNode::Object { properties, .. } => properties,
                SchemaNode::Encrypt { .. } => {
                    return Err(SchemaError::OverlappingPath {
                        parent: segments[..=depth].join("."),
                        child: rule.path.clone(),
                    });
                }
            };
        }

        if current.contains_key(*leaf) {
            return Err(SchemaError::OverlappingPath {
                parent: rule.path.clone(),
                child: rule.path.clone(),
            });
        }

        current.insert(
            leaf.to_string(),
            SchemaNode::Encrypt {
                encrypt: EncryptDirective {
                    bson_type: rule.bson_type.clone(),
                    algorithm: rule.algorithm,
                },
            },
        );
        Ok(())
    }
}
