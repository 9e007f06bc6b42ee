//! Local master key.
//!
//! The local provider keeps its master key in a file of base64 text that
//! decodes to exactly 96 bytes. Suitable for development only.

use std::fmt;
use std::fs;
use std::path::Path;

use base64::Engine;
use rand::RngCore;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::core::constants::LOCAL_MASTER_KEY_LEN;
use crate::error::{ConfigError, Result};

/// A 96-byte local master key. Wiped on drop.
#[derive(Clone)]
pub struct LocalKey {
    key: Zeroizing<Vec<u8>>,
}

impl LocalKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new(vec![0u8; LOCAL_MASTER_KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(key.as_mut_slice());
        Self { key }
    }

    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` unless `bytes` is exactly 96 bytes long.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let key = Zeroizing::new(bytes);
        if key.len() != LOCAL_MASTER_KEY_LEN {
            return Err(ConfigError::InvalidValue {
                field: "master key",
                reason: format!(
                    "expected {} bytes, got {}",
                    LOCAL_MASTER_KEY_LEN,
                    key.len()
                ),
            }
            .into());
        }
        Ok(Self { key })
    }

    /// Read a base64 key file.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingSecret` if the file is absent or unreadable
    /// - `ConfigError::InvalidEncoding` if it is not base64 or not 96 bytes
    pub fn read(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading local master key");

        let text = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
            trace!(error = %e, "master key read failed");
            ConfigError::MissingSecret {
                path: path.to_path_buf(),
            }
        })?);

        let key = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| ConfigError::InvalidEncoding {
                    path: path.to_path_buf(),
                    reason: format!("invalid base64: {}", e),
                })?,
        );

        if key.len() != LOCAL_MASTER_KEY_LEN {
            return Err(ConfigError::InvalidEncoding {
                path: path.to_path_buf(),
                reason: format!(
                    "expected {} bytes, decoded {}",
                    LOCAL_MASTER_KEY_LEN,
                    key.len()
                ),
            }
            .into());
        }

        Ok(Self { key })
    }

    /// Write the key as base64 text with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SecretExists` if the file exists and `force` is false.
    pub fn write(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(ConfigError::SecretExists(path.to_path_buf()).into());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_base64().as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %path.display(), "local master key written");
        Ok(())
    }

    /// Base64 text of the key.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(base64::engine::general_purpose::STANDARD.encode(self.key.as_slice()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKey")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}
