//! Core library components.
//!
//! Master key resolution, the data key registry and schema building, plus
//! the configuration and storage they run on.

pub mod config;
pub mod constants;
pub mod env;
pub mod kms;
pub mod namespace;
pub mod registry;
pub mod schema;
pub mod types;
pub mod vault;
