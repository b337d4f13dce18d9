//! oauth::lock
//!
//! Per-authority file lock for token refresh.
//!
//! # Invariants
//!
//! Refresh tokens are single-use and rotate on each refresh, so two helper
//! processes refreshing the same account concurrently would invalidate one
//! another. The lock serializes refresh per authority; after acquiring it
//! the caller must re-read the stored token, because another process may
//! already have refreshed.
//!
//! The lock is released on drop (RAII), including on panic.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Default timeout for lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Polling interval while waiting for the lock.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An exclusive refresh lock for one authority.
#[derive(Debug)]
pub struct RefreshLock {
    path: PathBuf,
    file: Option<File>,
}

impl RefreshLock {
    /// Acquire the lock for `scope`, blocking up to `timeout`.
    ///
    /// `scope` is typically the authority URL plus the account; it is
    /// sanitized into a file name.
    pub fn acquire(scope: &str, timeout: Duration) -> Result<Self> {
        let path = Self::lock_path(scope)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("cannot create lock directory: {}", e)))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::Internal(format!("cannot open lock file: {}", e)))?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        path,
                        file: Some(file),
                    })
                }
                Err(_) if Instant::now() < deadline => thread::sleep(LOCK_POLL_INTERVAL),
                Err(_) => {
                    return Err(Error::Transient(
                        "another helper instance is refreshing tokens".into(),
                    ))
                }
            }
        }
    }

    /// Path of the lock file for a scope.
    fn lock_path(scope: &str) -> Result<PathBuf> {
        let dir = dirs::data_dir()
            .ok_or_else(|| Error::Internal("cannot determine user data directory".into()))?;
        let sanitized: String = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Ok(dir
            .join("quay")
            .join("locks")
            .join(format!("refresh-{}.lock", sanitized)))
    }

    /// Whether the lock is currently held by this guard.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the lock file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for RefreshLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_is_sanitized() {
        let path = RefreshLock::lock_path("https://login.microsoftonline.com/T1:alice@contoso.com")
            .expect("path");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("refresh-"));
        assert!(name.ends_with(".lock"));
        assert!(!name.contains('/'));
        assert!(!name.contains(':'));
        assert!(!name.contains('@'));
    }

    #[test]
    fn acquire_and_drop_releases() {
        let first = RefreshLock::acquire("quay-test-lock", DEFAULT_LOCK_TIMEOUT).expect("acquire");
        assert!(first.is_held());
        drop(first);

        // Re-acquiring immediately must succeed once the guard is dropped.
        let second =
            RefreshLock::acquire("quay-test-lock", Duration::from_secs(1)).expect("reacquire");
        assert!(second.is_held());
    }
}
