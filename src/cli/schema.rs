//! Schema command - print the encryption schema map for a collection.

use std::path::PathBuf;

use tracing::debug;

use crate::cli::{output, Context};
use crate::core::namespace::Namespace;
use crate::core::schema::{FieldRule, SchemaBuilder};
use crate::core::vault::KeyId;
use crate::error::Result;

/// Build the schema map. Rules given on the command line replace the
/// configured ones.
pub fn execute(
    ctx: &Context,
    key_id: KeyId,
    namespace: Option<Namespace>,
    fields: Vec<FieldRule>,
    out: Option<PathBuf>,
) -> Result<()> {
    let namespace = namespace.unwrap_or_else(|| ctx.config.schema.namespace.clone());
    let fields = if fields.is_empty() {
        ctx.config.schema.fields.clone()
    } else {
        fields
    };
    debug!(%namespace, fields = fields.len(), "building schema");

    let json = SchemaBuilder::build(key_id, &namespace, &fields)?.to_json_string()?;

    match out {
        Some(path) => {
            std::fs::write(&path, format!("{}\n", json))?;
            output::success(&format!(
                "schema for {} written to {}",
                namespace,
                output::path(&path)
            ));
        }
        None => output::data(json),
    }
    Ok(())
}
