//! secrets::plaintext_store
//!
//! Plaintext file-backed secret storage.
//!
//! # Security
//!
//! This backend stores secrets unencrypted and is rejected unless the user
//! explicitly selects it (`GCM_CREDENTIAL_STORE=plaintext`). It exists for
//! headless machines with no secret service. What it does guarantee:
//!
//! - File permissions are 0600 on Unix (owner read/write only)
//! - All writes are atomic (write temp file, fsync, rename)
//! - Secrets never appear in error messages

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::traits::{SecretError, SecretStore};

/// File name of the credential map inside the store directory.
const STORE_FILE: &str = "credentials.toml";

/// Plaintext file-backed secret storage.
///
/// Stores a flat key/value map as TOML in `<dir>/credentials.toml`.
#[derive(Debug)]
pub struct PlaintextSecretStore {
    path: PathBuf,
}

impl PlaintextSecretStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(STORE_FILE),
        }
    }

    /// Path to the credential file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, SecretError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read credential file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| SecretError::ReadError(format!("cannot parse credential file: {}", e)))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), SecretError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(map)
            .map_err(|e| SecretError::WriteError(format!("cannot serialize credentials: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

            #[cfg(unix)]
            {
                let permissions = fs::Permissions::from_mode(0o600);
                file.set_permissions(permissions)
                    .map_err(|e| SecretError::WriteError(format!("cannot set permissions: {}", e)))?;
            }

            file.write_all(content.as_bytes())
                .map_err(|e| SecretError::WriteError(format!("cannot write credentials: {}", e)))?;
            file.sync_all()
                .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))?;
        Ok(())
    }
}

impl SecretStore for PlaintextSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut map = self.read_map()?;
        map.remove(key);
        self.write_map(&map)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, SecretError> {
        Ok(self
            .read_map()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
