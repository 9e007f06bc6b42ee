//! csfle - envelope keys and encryption schemas for client-side field level encryption.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── master_key    # Generate a local master key
//! │   ├── data_key      # Find or create a data key
//! │   ├── schema        # Print the schema map
//! │   ├── demo          # Encrypted round trip (mongo)
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # csfle.toml management
//!     ├── env           # Environment and .env lookup
//!     ├── kms/          # Master key sources
//!     │   ├── local     # 96-byte key file
//!     │   ├── aws       # AWS KMS
//!     │   ├── azure     # Azure Key Vault
//!     │   └── gcp       # Google Cloud KMS
//!     ├── registry      # One data key per alt name
//!     ├── schema/       # Field rules to schema documents
//!     └── vault/        # Key vault storage
//!         ├── mod       # KeyVault trait
//!         ├── memory    # In-process vault
//!         └── mongo     # MongoDB vault (mongo)
//! ```
//!
//! # Flow
//!
//! A master key is resolved for one provider, the registry makes sure a
//! data key exists for the configured alt name, and the schema builder binds
//! field rules to that key. The resulting schema map configures an
//! auto-encrypting database client.

pub mod cli;
pub mod core;
pub mod error;
