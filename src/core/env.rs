//! Environment lookup with `.env` layering.
//!
//! Provider credentials come from named values. The process environment
//! wins; a dotenv file fills in anything it does not set. Empty values count
//! as absent.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// A source of named configuration values.
pub trait EnvSource {
    /// Look up a value. Unset and empty values both return `None`.
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// Process environment layered over values parsed from a dotenv file.
#[derive(Debug, Default)]
pub struct Layered {
    file: HashMap<String, String>,
}

impl Layered {
    /// Layer the process environment over the given dotenv file.
    ///
    /// A missing file is not an error; it simply contributes nothing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no dotenv file");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let file = parse(&contents);
        debug!(path = %path.display(), vars = file.len(), "dotenv loaded");
        Ok(Self { file })
    }
}

impl EnvSource for Layered {
    fn var(&self, name: &str) -> Option<String> {
        ProcessEnv.var(name).or_else(|| self.file.var(name))
    }
}

/// Parse dotenv contents into a map.
///
/// Skips blank lines and comments, accepts an optional `export ` prefix and
/// strips one layer of matching quotes.
pub fn parse(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }
    }

    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
