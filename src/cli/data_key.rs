//! Data-key command - find or create the data key for an alt name.

use tracing::debug;

use crate::cli::{output, Context};
use crate::core::kms::{self, MasterKeyMaterial, Provider};
use crate::core::registry::{DataKeyRegistry, KeyOutcome};
use crate::core::vault::{KeyVault, MemoryVault};
use crate::error::Result;

/// Resolve the master key, ensure the index and find-or-create the key.
///
/// Configuration problems surface before any connection is attempted.
pub fn execute(
    ctx: &Context,
    provider: Option<Provider>,
    alt_name: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let provider = provider.unwrap_or(ctx.config.kms.provider);
    let alt_name = alt_name.unwrap_or_else(|| ctx.config.vault.key_alt_name.clone());

    let material = kms::resolve(provider, &ctx.config.kms, &ctx.env)?;

    let outcome = if dry_run {
        debug!("using in-memory key vault");
        let vault = MemoryVault::new(ctx.config.vault.namespace.clone());
        provision(DataKeyRegistry::new(vault, ctx.config.timeout()), &alt_name, &material)?
    } else {
        provision(DataKeyRegistry::new(open_vault(ctx)?, ctx.config.timeout()), &alt_name, &material)?
    };

    report(&alt_name, provider, &outcome);
    output::data(outcome.id());
    Ok(())
}

/// Ensure the index, then find or create the key.
pub(crate) fn provision<V: KeyVault>(
    registry: DataKeyRegistry<V>,
    alt_name: &str,
    material: &MasterKeyMaterial,
) -> Result<KeyOutcome> {
    registry.ensure_index()?;
    registry.find_or_create(alt_name, material, &material.key_spec())
}

fn report(alt_name: &str, provider: Provider, outcome: &KeyOutcome) {
    match outcome {
        KeyOutcome::Found(_) => output::success(&format!("data key '{}' already exists", alt_name)),
        KeyOutcome::Created(_) => output::success(&format!("created data key '{}'", alt_name)),
        KeyOutcome::RaceRecovered(_) => output::warn(&format!(
            "data key '{}' was created concurrently; using the existing key",
            alt_name
        )),
    }
    output::kv("provider:", provider);
    output::kv("key id:", outcome.id());
    output::kv("uuid:", outcome.id().to_uuid_string());
}

#[cfg(feature = "mongo")]
pub(crate) fn open_vault(ctx: &Context) -> Result<crate::core::vault::mongo::MongoVault> {
    crate::core::vault::mongo::MongoVault::connect(
        &ctx.config.vault.connection_string,
        ctx.config.vault.namespace.clone(),
        ctx.config.timeout(),
    )
}

#[cfg(not(feature = "mongo"))]
pub(crate) fn open_vault(_ctx: &Context) -> Result<MemoryVault> {
    Err(crate::error::StorageError::Unavailable.into())
}
