//! Master-key command - generate a local master key file.

use std::path::PathBuf;

use tracing::info;

use crate::cli::{output, Context};
use crate::core::kms::{LocalKey, MasterKeyMaterial};
use crate::error::Result;

/// Write a fresh 96-byte local master key.
pub fn execute(ctx: &Context, out: Option<PathBuf>, force: bool) -> Result<()> {
    let path = out.unwrap_or_else(|| ctx.config.kms.master_key_path.clone());

    let key = LocalKey::generate();
    key.write(&path, force)?;

    let fingerprint = MasterKeyMaterial::Local(key).fingerprint();
    info!(path = %path.display(), %fingerprint, "master key generated");

    output::success(&format!("master key written to {}", output::path(&path)));
    output::kv("fingerprint:", &fingerprint);
    output::hint("keep this file out of version control");
    output::data(path.display());
    Ok(())
}
