//! Demo command - encrypted write/read round trip.
//!
//! Provisions the data key, builds the patient schema, then inserts a
//! patient through an auto-encrypting client and reads it back both with
//! and without decryption.

use mongodb::bson::{doc, Bson, Document};
use tracing::info;

use crate::cli::data_key::open_vault;
use crate::cli::{output, Context};
use crate::core::kms::{self, Provider};
use crate::core::registry::DataKeyRegistry;
use crate::core::schema::SchemaBuilder;
use crate::error::{Result, StorageError};

/// Run the round trip.
pub fn execute(ctx: &Context, provider: Option<Provider>) -> Result<()> {
    let provider = provider.unwrap_or(ctx.config.kms.provider);
    let material = kms::resolve(provider, &ctx.config.kms, &ctx.env)?;

    let registry = DataKeyRegistry::new(open_vault(ctx)?, ctx.config.timeout());
    registry.ensure_index()?;
    let outcome = registry.find_or_create(
        &ctx.config.vault.key_alt_name,
        &material,
        &material.key_spec(),
    )?;
    output::success(&format!("data key {} ({})", outcome.id(), outcome.label()));

    let namespace = &ctx.config.schema.namespace;
    let schema_map = SchemaBuilder::build(outcome.id(), namespace, &ctx.config.schema.fields)?;
    if let Some(schema) = schema_map.get(namespace) {
        registry.verify(schema)?;
    }
    output::success(&format!("schema built for {}", namespace));

    let vault = registry.vault();
    let encrypted = vault.encrypted_client(&ctx.config.vault.connection_string, &material, &schema_map)?;

    let patient = doc! {
        "name": "Jon Doe",
        "ssn": 241014209,
        "bloodType": "AB+",
        "medicalRecords": [{ "weight": 180, "bloodPressure": "120/80" }],
        "insurance": { "provider": "MaestCare", "policyNumber": 123142 },
    };

    let (plain, decrypted) = vault.block_on(async {
        let db = encrypted.database(&namespace.db);
        let secure = db.collection::<Document>(&namespace.coll);
        secure.drop().await.map_err(storage)?;
        secure.insert_one(patient).await.map_err(storage)?;

        let regular = vault
            .client()
            .database(&namespace.db)
            .collection::<Document>(&namespace.coll);
        let plain = regular
            .find_one(doc! { "name": "Jon Doe" })
            .await
            .map_err(storage)?;
        // Deterministic fields can be queried while encrypted.
        let decrypted = secure
            .find_one(doc! { "ssn": 241014209 })
            .await
            .map_err(storage)?;
        Ok::<_, crate::error::Error>((plain, decrypted))
    })?;

    output::section("Without the key");
    if let Some(doc) = &plain {
        for rule in &ctx.config.schema.fields {
            let shown = match lookup(doc, &rule.path) {
                Some(Bson::Binary(_)) => "<encrypted>".to_string(),
                Some(other) => other.to_string(),
                None => "<missing>".to_string(),
            };
            output::kv(&format!("{}:", rule.path), shown);
        }
    }

    output::section("With the key");
    if let Some(doc) = &decrypted {
        for rule in &ctx.config.schema.fields {
            let shown = lookup(doc, &rule.path)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<missing>".to_string());
            output::kv(&format!("{}:", rule.path), shown);
        }
    }

    info!(namespace = %namespace, "demo round trip complete");
    Ok(())
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut value = doc.get(segments.next()?)?;
    for segment in segments {
        value = value.as_document()?.get(segment)?;
    }
    Some(value)
}

fn storage(err: mongodb::error::Error) -> crate::error::Error {
    StorageError::Backend(err.to_string()).into()
}
