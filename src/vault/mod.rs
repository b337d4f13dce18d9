//! vault
//!
//! The credential record and the store facade over [`SecretStore`]
//! backends.
//!
//! # Service keys
//!
//! A credential is filed under a *service* string of the form
//! `<namespace>:<canonical-url>`, where the namespace defaults to `git`.
//! Canonicalization lowercases the host, strips query strings and
//! fragments, and keeps the path only when the caller asked for
//! path-scoped credentials (`credential.useHttpPath`).
//!
//! # Payload
//!
//! Each entry's value is a small JSON document holding the username and
//! the secret, so a single keyed store slot carries the whole credential.
//!
//! # Security
//!
//! [`Credential`] implements a custom `Debug` that redacts the secret.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::secrets::SecretStore;
use crate::uri::RemoteUri;

/// Default namespace prefixed to every service key.
pub const DEFAULT_NAMESPACE: &str = "git";

/// A `(username, secret)` credential.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    /// Account name presented to the remote.
    pub username: String,

    /// The secret. Never logged; see the custom `Debug`.
    secret: String,
}

impl Credential {
    /// Create a credential.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// The secret value.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Parse a credential payload from JSON.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Internal(format!("invalid credential payload: {}", e)))
    }

    /// Serialize the credential payload to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("cannot serialize credential: {}", e)))
    }
}

// Custom Debug to avoid exposing the secret.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Facade over a [`SecretStore`] backend with service-key composition.
pub struct CredentialVault {
    namespace: String,
    store: Box<dyn SecretStore>,
}

impl CredentialVault {
    /// Create a vault over `store` with the given namespace.
    pub fn new(namespace: impl Into<String>, store: Box<dyn SecretStore>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
        }
    }

    /// The namespace prefixed to every service key.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Compose the service key for a remote.
    pub fn service_for(&self, uri: &RemoteUri, use_http_path: bool) -> String {
        format!("{}:{}", self.namespace, uri.canonical(use_http_path))
    }

    /// Compose a service key for an auxiliary record (e.g. a refresh
    /// token), namespaced alongside regular credentials.
    pub fn service_for_label(&self, label: &str) -> String {
        format!("{}:{}", self.namespace, label)
    }

    /// Get the credential filed under `service`.
    ///
    /// When `account` is given, a stored credential with a different
    /// username is treated as a miss.
    pub fn get(&self, service: &str, account: Option<&str>) -> Result<Option<Credential>> {
        let Some(payload) = self.store.get(service)? else {
            return Ok(None);
        };
        let credential = Credential::parse(&payload)?;
        if let Some(account) = account {
            if !credential.username.eq_ignore_ascii_case(account) {
                return Ok(None);
            }
        }
        Ok(Some(credential))
    }

    /// All `(service, account)` keys under a service prefix.
    ///
    /// Backends that cannot enumerate return only an exact-prefix probe.
    pub fn list(&self, service_prefix: &str) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        let mut keys = self.store.keys(service_prefix)?;
        if keys.is_empty() && self.store.exists(service_prefix)? {
            keys.push(service_prefix.to_string());
        }
        for key in keys {
            if let Some(payload) = self.store.get(&key)? {
                let credential = Credential::parse(&payload)?;
                out.push((key, credential.username));
            }
        }
        Ok(out)
    }

    /// Upsert the credential for `service`, replacing any existing secret.
    pub fn add_or_update(&self, service: &str, credential: &Credential) -> Result<()> {
        self.store.set(service, &credential.to_json()?)?;
        Ok(())
    }

    /// Remove the credential filed under `service`.
    ///
    /// When `account` is given, a stored credential under a different
    /// username is left alone.
    pub fn remove(&self, service: &str, account: Option<&str>) -> Result<()> {
        if let Some(account) = account {
            match self.get(service, Some(account))? {
                Some(_) => {}
                None => return Ok(()),
            }
        }
        self.store.delete(service)?;
        Ok(())
    }
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory secret store for testing.
    pub(crate) struct MockSecretStore {
        data: Mutex<HashMap<String, String>>,
    }

    impl MockSecretStore {
        pub(crate) fn new() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
            }
        }
    }

    impl SecretStore for MockSecretStore {
        fn get(&self, key: &str) -> std::result::Result<Option<String>, SecretError> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> std::result::Result<(), SecretError> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn delete(&self, key: &str) -> std::result::Result<(), SecretError> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }

        fn keys(&self, prefix: &str) -> std::result::Result<Vec<String>, SecretError> {
            Ok(self
                .data
                .lock()
                .unwrap()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }
    }

    fn vault() -> CredentialVault {
        CredentialVault::new(DEFAULT_NAMESPACE, Box::new(MockSecretStore::new()))
    }

    #[test]
    fn service_key_default_drops_path() {
        let v = vault();
        let uri = RemoteUri::parse("https://GitHub.com/Owner/Repo?x=1#f").expect("uri");
        assert_eq!(v.service_for(&uri, false), "git:https://github.com");
    }

    #[test]
    fn service_key_keeps_path_when_requested() {
        let v = vault();
        let uri = RemoteUri::parse("https://dev.azure.com/contoso/_git/widgets").expect("uri");
        assert_eq!(
            v.service_for(&uri, true),
            "git:https://dev.azure.com/contoso/_git/widgets"
        );
    }

    #[test]
    fn custom_namespace_prefixes_service() {
        let v = CredentialVault::new("corp", Box::new(MockSecretStore::new()));
        let uri = RemoteUri::parse("https://github.com").expect("uri");
        assert_eq!(v.service_for(&uri, false), "corp:https://github.com");
    }

    #[test]
    fn add_then_get_round_trips() {
        let v = vault();
        let credential = Credential::new("alice", "s3cret");
        v.add_or_update("git:https://github.com", &credential)
            .expect("add");
        let fetched = v
            .get("git:https://github.com", None)
            .expect("get")
            .expect("present");
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.secret(), "s3cret");
    }

    #[test]
    fn get_with_mismatched_account_is_a_miss() {
        let v = vault();
        v.add_or_update("svc", &Credential::new("alice", "x"))
            .expect("add");
        assert!(v.get("svc", Some("bob")).expect("get").is_none());
        assert!(v.get("svc", Some("ALICE")).expect("get").is_some());
    }

    #[test]
    fn second_store_replaces_first_secret() {
        let v = vault();
        v.add_or_update("svc", &Credential::new("alice", "first"))
            .expect("add");
        v.add_or_update("svc", &Credential::new("alice", "second"))
            .expect("add");
        let got = v.get("svc", None).expect("get").expect("present");
        assert_eq!(got.secret(), "second");
    }

    #[test]
    fn remove_respects_account_filter() {
        let v = vault();
        v.add_or_update("svc", &Credential::new("alice", "x"))
            .expect("add");
        v.remove("svc", Some("bob")).expect("remove mismatched");
        assert!(v.get("svc", None).expect("get").is_some());
        v.remove("svc", Some("alice")).expect("remove matched");
        assert!(v.get("svc", None).expect("get").is_none());
    }

    #[test]
    fn list_enumerates_prefix() {
        let v = vault();
        v.add_or_update("git:https://github.com", &Credential::new("alice", "x"))
            .expect("add");
        v.add_or_update("git:https://dev.azure.com", &Credential::new("bob", "y"))
            .expect("add");

        let mut entries = v.list("git:").expect("list");
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("git:https://dev.azure.com".to_string(), "bob".to_string()),
                ("git:https://github.com".to_string(), "alice".to_string()),
            ]
        );
    }

    #[test]
    fn debug_never_exposes_secret() {
        let credential = Credential::new("alice", "hunter2");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
