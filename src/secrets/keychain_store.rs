//! secrets::keychain_store
//!
//! OS keychain secret storage.
//!
//! # Platform Support
//!
//! Uses the `keyring` crate, which maps onto:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (via D-Bus)
//!
//! # Feature Flag
//!
//! Only available with the `keychain` feature (enabled by default).
//!
//! # Enumeration
//!
//! OS keychains cannot enumerate entries they did not create in this
//! process, so `keys()` returns an empty list; the credential facade probes
//! exact keys instead.

#[cfg(feature = "keychain")]
use keyring::Entry;

use super::traits::{SecretError, SecretStore};

/// Keychain-backed secret storage.
#[cfg(feature = "keychain")]
#[derive(Debug)]
pub struct KeychainSecretStore {
    /// Service name under which all entries are filed.
    service: String,
}

#[cfg(feature = "keychain")]
impl KeychainSecretStore {
    /// Create a keychain store using the helper's canonical service name.
    pub fn new() -> Result<Self, SecretError> {
        Ok(Self {
            service: "git-credential-quay".to_string(),
        })
    }

    /// Create a keychain store with a custom service name (for tests).
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The keychain service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry, SecretError> {
        Entry::new(&self.service, key)
            .map_err(|e| SecretError::ReadError(format!("cannot create keyring entry: {}", e)))
    }
}

#[cfg(feature = "keychain")]
impl SecretStore for KeychainSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let entry = self.entry(key)?;
        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Err(SecretError::ReadError(
                "ambiguous keychain entry".to_string(),
            )),
            Err(e) => Err(SecretError::ReadError(format!(
                "cannot read keychain entry: {}",
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let entry = self.entry(key)?;
        entry
            .set_password(value)
            .map_err(|e| SecretError::WriteError(format!("cannot write keychain entry: {}", e)))
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let entry = self.entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretError::DeleteError(format!(
                "cannot delete keychain entry: {}",
                e
            ))),
        }
    }

    fn keys(&self, _prefix: &str) -> Result<Vec<String>, SecretError> {
        // The OS keychain cannot list entries; callers probe exact keys.
        Ok(Vec::new())
    }
}
