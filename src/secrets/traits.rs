//! secrets::traits
//!
//! Keyed secret storage trait definition.
//!
//! # Design
//!
//! The `SecretStore` trait is the only seam through which the helper touches
//! platform secret storage. Keys are flat namespaced strings (the credential
//! facade composes them as `<namespace>:<canonical-url>`); the store keeps
//! them as-is without interpretation.
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secret values in error messages
//! - Use storage mechanisms appropriate to the platform
//! - Be thread-safe (Send + Sync)

use thiserror::Error;

/// Errors from secret storage operations.
///
/// Error messages intentionally do not include secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Secret not found for the given key.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// Failed to read from secret storage.
    #[error("failed to read secret: {0}")]
    ReadError(String),

    /// Failed to write to secret storage.
    #[error("failed to write secret: {0}")]
    WriteError(String),

    /// Failed to delete from secret storage.
    #[error("failed to delete secret: {0}")]
    DeleteError(String),

    /// Backend not available or not configured.
    #[error("secret store backend not available: {0}")]
    BackendNotAvailable(String),
}

/// Trait for keyed secret storage backends.
///
/// Implementations must be thread-safe and must never expose secret values
/// through logs or error messages.
pub trait SecretStore: Send + Sync {
    /// Get a secret by key.
    ///
    /// Returns `Ok(Some(value))` if the secret exists, `Ok(None)` if it
    /// does not, `Err` if the store could not be consulted.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Set a secret, overwriting any existing value for the key.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Delete a secret. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    /// Check if a secret exists.
    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        Ok(self.get(key)?.is_some())
    }

    /// Enumerate keys with the given prefix.
    ///
    /// File-backed stores enumerate fully. OS keychains cannot list foreign
    /// entries, so their implementation is best-effort and may return an
    /// empty list; callers fall back to probing exact keys.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, SecretError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SecretError::NotFound("git:https://github.com".into());
        assert!(err.to_string().contains("git:https://github.com"));
        assert!(err.to_string().contains("not found"));

        let err = SecretError::ReadError("disk full".into());
        assert!(err.to_string().contains("read"));

        let err = SecretError::WriteError("permission denied".into());
        assert!(err.to_string().contains("write"));

        let err = SecretError::DeleteError("io error".into());
        assert!(err.to_string().contains("delete"));

        let err = SecretError::BackendNotAvailable("keychain".into());
        assert!(err.to_string().contains("backend"));
    }
}
