//! csfle - envelope keys and encryption schemas for client-side field level encryption.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use csfle::cli::output;
use csfle::cli::{execute, Cli};
use csfle::error::{ConfigError, Error, ProviderError, SchemaError, StorageError};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("CSFLE_LOG").unwrap_or_else(|_| {
        if cli.global.verbose {
            EnvFilter::new("csfle=debug")
        } else {
            EnvFilter::new("csfle=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = execute(cli.command, &cli.global) {
        output::error(&e.to_string());
        if let Some(hint) = suggestion(&e) {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}

fn suggestion(e: &Error) -> Option<&'static str> {
    match e {
        Error::Config(ConfigError::MissingField { .. }) => {
            Some("set the listed variables in the environment or in .env")
        }
        Error::Config(ConfigError::MissingSecret { .. }) => Some("run: csfle master-key"),
        Error::Config(ConfigError::InvalidEncoding { .. }) => {
            Some("regenerate it with: csfle master-key --force")
        }
        Error::Config(ConfigError::SecretExists(_)) => Some("pass --force to overwrite it"),
        Error::Storage(StorageError::Unavailable) => {
            Some("use --dry-run, or rebuild with: cargo install csfle --features mongo")
        }
        Error::Storage(StorageError::ConnectionFailed(_)) => {
            Some("check vault.connection_string in csfle.toml")
        }
        Error::Storage(StorageError::IndexConflict(_)) => {
            Some("drop the existing keyAltNames index so it can be recreated as unique and partial")
        }
        Error::Provider(ProviderError::AuthFailure { .. }) => {
            Some("check the provider credentials in the environment or .env")
        }
        Error::Provider(ProviderError::Timeout { .. }) => {
            Some("raise vault.timeout_secs in csfle.toml")
        }
        Error::Schema(SchemaError::UnresolvedKey(_)) => {
            Some("create the key first with: csfle data-key")
        }
        _ => None,
    }
}
