//! Command-line interface.

pub mod completions;
pub mod data_key;
#[cfg(feature = "mongo")]
pub mod demo;
pub mod master_key;
pub mod output;
pub mod schema;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::core::config::Config;
use crate::core::constants;
use crate::core::env::Layered;
use crate::core::kms::Provider;
use crate::core::namespace::Namespace;
use crate::core::schema::FieldRule;
use crate::core::vault::KeyId;
use crate::error::Result;

/// csfle - envelope keys and encryption schemas for client-side field level encryption.
#[derive(Parser)]
#[command(
    name = "csfle",
    about = "Envelope keys and encryption schemas for client-side field level encryption",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file
    #[arg(long, global = true, default_value = constants::CONFIG_FILE)]
    pub config: PathBuf,

    /// Dotenv file layered beneath the environment
    #[arg(long, global = true, default_value = constants::ENV_FILE)]
    pub env_file: PathBuf,

    /// Enable debug logging (overridden by CSFLE_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Generate a local master key file
    MasterKey {
        /// Where to write the key (defaults to kms.master_key_path)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Overwrite an existing key file
        #[arg(short, long)]
        force: bool,
    },

    /// Find or create the data key for an alt name and print its id
    DataKey {
        /// KMS provider wrapping the key (defaults to kms.provider)
        #[arg(short, long)]
        provider: Option<Provider>,
        /// Key alt name (defaults to vault.key_alt_name)
        #[arg(short, long)]
        alt_name: Option<String>,
        /// Use a throwaway in-memory vault instead of the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the encryption schema map for a collection
    Schema {
        /// Data key id, base64 or UUID
        #[arg(short, long)]
        key_id: KeyId,
        /// Encrypted collection (defaults to schema.namespace)
        #[arg(short, long)]
        namespace: Option<Namespace>,
        /// Field rule as path:bsonType:Algorithm (repeatable)
        #[arg(short, long = "field")]
        fields: Vec<FieldRule>,
        /// Write the schema to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run an encrypted write/read round trip against the database
    #[cfg(feature = "mongo")]
    Demo {
        /// KMS provider wrapping the key (defaults to kms.provider)
        #[arg(short, long)]
        provider: Option<Provider>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Configuration and environment shared by the commands.
pub struct Context {
    pub config: Config,
    pub env: Layered,
}

impl Context {
    /// Load `csfle.toml` and the dotenv file named by the global flags.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the config file is invalid.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config = Config::load(&global.config)?;
        let env = Layered::load(&global.env_file)?;
        debug!(config = %global.config.display(), env_file = %global.env_file.display(), "context loaded");
        Ok(Self { config, env })
    }
}

/// Execute a command.
pub fn execute(command: Command, global: &GlobalArgs) -> Result<()> {
    use Command::*;

    if let Completions { shell } = command {
        return completions::execute(shell);
    }

    let ctx = Context::load(global)?;

    match command {
        MasterKey { out, force } => master_key::execute(&ctx, out, force),
        DataKey {
            provider,
            alt_name,
            dry_run,
        } => data_key::execute(&ctx, provider, alt_name, dry_run),
        Schema {
            key_id,
            namespace,
            fields,
            out,
        } => schema::execute(&ctx, key_id, namespace, fields, out),
        #[cfg(feature = "mongo")]
        Demo { provider } => demo::execute(&ctx, provider),
        Completions { shell } => completions::execute(shell),
    }
}
