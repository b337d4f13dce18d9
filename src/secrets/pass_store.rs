//! secrets::pass_store
//!
//! GPG `pass`(1) secret storage.
//!
//! # Design
//!
//! Shells out to the standard `pass` binary, storing each secret as a
//! single-line entry under a `git-credential/` folder in the password
//! store. Key characters that `pass` treats as path separators are kept
//! as-is (keys already look like `git:https://host/path`), since `pass`
//! accepts arbitrary entry names below its root.

use std::process::{Command, Stdio};

use std::io::Write;

use super::traits::{SecretError, SecretStore};

/// Folder inside the password store that holds helper entries.
const PASS_FOLDER: &str = "git-credential";

/// `pass`(1)-backed secret storage.
#[derive(Debug)]
pub struct PassSecretStore {
    /// The pass binary to invoke.
    binary: String,
}

impl PassSecretStore {
    /// Create a store invoking the `pass` binary from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: "pass".to_string(),
        }
    }

    /// Create a store invoking a specific binary (for tests).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn entry_name(key: &str) -> String {
        format!("{}/{}", PASS_FOLDER, key)
    }
}

impl Default for PassSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for PassSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let output = Command::new(&self.binary)
            .arg("show")
            .arg(Self::entry_name(key))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SecretError::BackendNotAvailable(format!("cannot run pass: {}", e)))?;

        if !output.status.success() {
            // pass exits non-zero both for missing entries and real errors;
            // a missing entry is the overwhelmingly common case.
            return Ok(None);
        }

        let value = String::from_utf8(output.stdout)
            .map_err(|_| SecretError::ReadError("pass entry is not valid UTF-8".into()))?;
        Ok(Some(value.trim_end_matches('\n').to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut child = Command::new(&self.binary)
            .arg("insert")
            .arg("--multiline")
            .arg("--force")
            .arg(Self::entry_name(key))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SecretError::BackendNotAvailable(format!("cannot run pass: {}", e)))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(value.as_bytes())
                .map_err(|e| SecretError::WriteError(format!("cannot write to pass: {}", e)))?;
        }

        let status = child
            .wait()
            .map_err(|e| SecretError::WriteError(format!("pass did not exit: {}", e)))?;
        if !status.success() {
            return Err(SecretError::WriteError("pass insert failed".into()));
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let output = Command::new(&self.binary)
            .arg("rm")
            .arg("--force")
            .arg(Self::entry_name(key))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SecretError::BackendNotAvailable(format!("cannot run pass: {}", e)))?;

        // Removing a missing entry is not an error (delete is idempotent).
        let _ = output;
        Ok(())
    }

    fn keys(&self, _prefix: &str) -> Result<Vec<String>, SecretError> {
        // Enumerating would require walking the password store directory;
        // callers probe exact keys instead, as with the OS keychain.
        Ok(Vec::new())
    }
}
