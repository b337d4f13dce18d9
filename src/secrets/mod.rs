//! secrets
//!
//! Secret storage abstraction and backend selection.
//!
//! # Architecture
//!
//! Secrets flow through the [`SecretStore`] trait, with backends chosen at
//! process start from a closed set:
//!
//! - [`KeychainSecretStore`]: OS keychain / Credential Manager / Secret
//!   Service (feature `keychain`, the default backend)
//! - [`PassSecretStore`]: GPG `pass`(1)
//! - [`PlaintextSecretStore`]: unencrypted file, explicit opt-in only
//!
//! # Security
//!
//! All backends follow the same rules: secrets never appear in logs or
//! error messages, file-backed stores write atomically with 0600
//! permissions, and the plaintext backend is rejected unless the user
//! selects it explicitly.

mod keychain_store;
mod pass_store;
mod plaintext_store;
mod traits;

use std::path::PathBuf;

#[cfg(feature = "keychain")]
pub use keychain_store::KeychainSecretStore;
pub use pass_store::PassSecretStore;
pub use plaintext_store::PlaintextSecretStore;
pub use traits::{SecretError, SecretStore};

/// The closed set of credential-store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Platform default keychain (macOS Keychain, Windows Credential
    /// Manager, freedesktop Secret Service).
    Keychain,
    /// GPG `pass`(1) store.
    GpgPass,
    /// Plaintext file store (explicit opt-in).
    PlaintextFile,
}

impl Backend {
    /// Parse a backend selector (`GCM_CREDENTIAL_STORE` /
    /// `credential.credentialStore`).
    ///
    /// The platform-specific names all map onto the keychain backend; the
    /// `keyring` crate picks the right driver for the OS.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "keychain" | "secretservice" | "wincredman" | "dpapi" => Some(Backend::Keychain),
            "gpg" | "pass" => Some(Backend::GpgPass),
            "plaintext" | "cache" => Some(Backend::PlaintextFile),
            _ => None,
        }
    }

    /// The canonical selector name.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Keychain => "keychain",
            Backend::GpgPass => "gpg",
            Backend::PlaintextFile => "plaintext",
        }
    }
}

/// Create a secret store for the selected backend.
///
/// `plaintext_dir` is only consulted for the plaintext backend; when the
/// user has not supplied one it defaults to the helper's user-data
/// directory.
pub fn create_store(
    backend: Backend,
    plaintext_dir: Option<PathBuf>,
) -> Result<Box<dyn SecretStore>, SecretError> {
    match backend {
        #[cfg(feature = "keychain")]
        Backend::Keychain => Ok(Box::new(KeychainSecretStore::new()?)),
        #[cfg(not(feature = "keychain"))]
        Backend::Keychain => Err(SecretError::BackendNotAvailable(
            "keychain support not enabled (compile with --features keychain)".into(),
        )),
        Backend::GpgPass => Ok(Box::new(PassSecretStore::new())),
        Backend::PlaintextFile => {
            let dir = plaintext_dir
                .or_else(default_plaintext_dir)
                .ok_or_else(|| {
                    SecretError::BackendNotAvailable(
                        "cannot determine a directory for the plaintext store".into(),
                    )
                })?;
            Ok(Box::new(PlaintextSecretStore::new(dir)))
        }
    }
}

/// Default directory for the plaintext store.
fn default_plaintext_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("quay").join("store"))
}
