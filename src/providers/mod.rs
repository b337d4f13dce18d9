//! providers
//!
//! Host providers and the ordered registry that selects among them.
//!
//! # Design
//!
//! Providers form a closed set, expressed as the [`HostProvider`] variant
//! with a capability table of methods (match predicate, `get`/`store`/
//! `erase`). The registry is an ordered list of variant values: selection
//! applies each provider's match predicate in order and returns the first
//! match, with the generic provider as the terminal fallback.
//!
//! A `credential.<scope>.provider=<id>` setting (or `GCM_PROVIDER`)
//! overrides matching entirely; an unknown id is a fatal configuration
//! error.

pub mod azure;
pub mod generic;
pub mod github;

use std::sync::{Arc, Mutex};

use crate::azure::AzureReposCache;
use crate::error::{Error, Result};
use crate::protocol::Request;
use crate::settings::Settings;
use crate::ui::Prompter;
use crate::vault::{Credential, CredentialVault};

pub use azure::AzureReposProvider;
pub use generic::GenericProvider;
pub use github::GitHubProvider;

/// Shared collaborators handed to every provider at construction.
///
/// The Azure cache handle is injected here, breaking the provider/cache
/// reference cycle at process init.
#[derive(Clone)]
pub struct ProviderContext {
    /// Process-wide settings resolver (read-only).
    pub settings: Arc<Settings>,
    /// Credential store facade.
    pub vault: Arc<CredentialVault>,
    /// Interactive prompter.
    pub prompter: Arc<dyn Prompter>,
    /// Azure Repos sign-in cache.
    pub azure_cache: Arc<Mutex<AzureReposCache>>,
}

/// The closed set of host providers.
pub enum HostProvider {
    /// Azure Repos (`dev.azure.com`, `*.visualstudio.com`).
    AzureRepos(AzureReposProvider),
    /// GitHub (dotcom, gist, GitHub Enterprise).
    GitHub(GitHubProvider),
    /// Generic basic/Windows-integrated fallback.
    Generic(GenericProvider),
}

impl std::fmt::Debug for HostProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl HostProvider {
    /// Stable provider id used in configuration.
    pub fn id(&self) -> &'static str {
        match self {
            HostProvider::AzureRepos(_) => "azure-repos",
            HostProvider::GitHub(_) => "github",
            HostProvider::Generic(_) => "generic",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            HostProvider::AzureRepos(_) => "Azure Repos",
            HostProvider::GitHub(_) => "GitHub",
            HostProvider::Generic(_) => "Generic",
        }
    }

    /// Legacy authority ids this provider also answers to
    /// (`GCM_AUTHORITY` compatibility).
    pub fn authority_ids(&self) -> &'static [&'static str] {
        match self {
            HostProvider::AzureRepos(_) => &["msa", "aad", "azure"],
            HostProvider::GitHub(_) => &["github"],
            HostProvider::Generic(_) => &["basic", "integrated", "windows", "ntlm", "negotiate"],
        }
    }

    /// Whether a forced provider id refers to this provider.
    pub fn matches_id(&self, id: &str) -> bool {
        id.eq_ignore_ascii_case(self.id())
            || self
                .authority_ids()
                .iter()
                .any(|a| a.eq_ignore_ascii_case(id))
    }

    /// Match predicate over a credential request.
    pub fn is_supported(&self, request: &Request) -> bool {
        match self {
            HostProvider::AzureRepos(p) => p.is_supported(request),
            HostProvider::GitHub(p) => p.is_supported(request),
            HostProvider::Generic(_) => true,
        }
    }

    /// Serve a `get`: produce a credential or decline with `None`.
    pub async fn get(&self, request: &Request) -> Result<Option<Credential>> {
        match self {
            HostProvider::AzureRepos(p) => p.get(request).await,
            HostProvider::GitHub(p) => p.get(request).await,
            HostProvider::Generic(p) => p.get(request).await,
        }
    }

    /// Persist a credential Git has just validated.
    pub async fn store(&self, request: &Request) -> Result<()> {
        match self {
            HostProvider::AzureRepos(p) => p.store(request),
            HostProvider::GitHub(p) => p.store(request),
            HostProvider::Generic(p) => p.store(request),
        }
    }

    /// Drop a credential Git has just rejected.
    pub async fn erase(&self, request: &Request) -> Result<()> {
        match self {
            HostProvider::AzureRepos(p) => p.erase(request),
            HostProvider::GitHub(p) => p.erase(request),
            HostProvider::Generic(p) => p.erase(request),
        }
    }
}

/// Ordered provider registry.
pub struct Registry {
    providers: Vec<HostProvider>,
}

impl Registry {
    /// Build a registry from an explicit provider list (tests).
    pub fn new(providers: Vec<HostProvider>) -> Self {
        Self { providers }
    }

    /// Build the standard registry: Azure Repos, GitHub, then the generic
    /// terminal fallback.
    pub fn with_default_providers(ctx: &ProviderContext) -> Self {
        Self::new(vec![
            HostProvider::AzureRepos(AzureReposProvider::new(ctx)),
            HostProvider::GitHub(GitHubProvider::new(ctx)),
            HostProvider::Generic(GenericProvider::new(ctx)),
        ])
    }

    /// The registered providers, in match order.
    pub fn providers(&self) -> &[HostProvider] {
        &self.providers
    }

    /// Select the provider for a request.
    ///
    /// A forced id bypasses the match predicates entirely; an unknown id
    /// is a fatal configuration error.
    pub fn select(&self, request: &Request, forced_id: Option<&str>) -> Result<&HostProvider> {
        if let Some(id) = forced_id {
            return self
                .providers
                .iter()
                .find(|p| p.matches_id(id))
                .ok_or_else(|| Error::NoProvider(format!("unknown credential provider '{}'", id)));
        }

        self.providers
            .iter()
            .find(|p| p.is_supported(request))
            .ok_or_else(|| {
                Error::NoProvider("no credential provider matches this request".into())
            })
    }
}

/// Whether the session can open a browser window.
///
/// Desktop platforms always can; on other Unixes a display server must be
/// reachable.
pub(crate) fn desktop_session_available() -> bool {
    if cfg!(target_os = "macos") || cfg!(windows) {
        return true;
    }
    std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::git::GitConfig;
    use crate::secrets::{SecretError, SecretStore};
    use crate::ui::{prompts::BasicPromptResult, PromptError};
    use std::collections::HashMap;

    /// In-memory secret store shared by provider tests.
    pub struct MemoryStore {
        data: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
            }
        }
    }

    impl SecretStore for MemoryStore {
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

    /// Prompter that returns canned answers, or cancels when empty.
    pub struct ScriptedPrompter {
        pub basic: Option<(String, String)>,
        pub secret: Option<String>,
    }

    impl ScriptedPrompter {
        pub fn refusing() -> Self {
            Self {
                basic: None,
                secret: None,
            }
        }

        pub fn with_basic(username: &str, password: &str) -> Self {
            Self {
                basic: Some((username.to_string(), password.to_string())),
                secret: None,
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask_basic(
            &self,
            _resource: &str,
            preset_username: Option<&str>,
        ) -> std::result::Result<BasicPromptResult, PromptError> {
            match &self.basic {
                Some((username, password)) => Ok(BasicPromptResult {
                    username: preset_username.unwrap_or(username).to_string(),
                    password: password.clone(),
                }),
                None => Err(PromptError::Cancelled),
            }
        }

        fn ask_secret(&self, _message: &str) -> std::result::Result<String, PromptError> {
            self.secret.clone().ok_or(PromptError::Cancelled)
        }

        fn show_device_code(
            &self,
            _user_code: &str,
            _verification_uri: &str,
        ) -> std::result::Result<(), PromptError> {
            Ok(())
        }
    }

    /// Build a provider context over temp storage.
    pub fn context(dir: &tempfile::TempDir, prompter: Arc<dyn Prompter>) -> ProviderContext {
        context_with_settings(dir, prompter, Settings::from_parts(vec![], GitConfig::default()))
    }

    pub fn context_with_settings(
        dir: &tempfile::TempDir,
        prompter: Arc<dyn Prompter>,
        settings: Settings,
    ) -> ProviderContext {
        ProviderContext {
            settings: Arc::new(settings),
            vault: Arc::new(CredentialVault::new("git", Box::new(MemoryStore::new()))),
            prompter,
            azure_cache: Arc::new(Mutex::new(AzureReposCache::new(
                dir.path().join("azrepos.ini"),
            ))),
        }
    }

    pub fn request(lines: &[(&str, &str)]) -> Request {
        Request::from_attributes(
            lines
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registry(dir: &TempDir) -> Registry {
        let ctx = context(dir, Arc::new(ScriptedPrompter::refusing()));
        Registry::with_default_providers(&ctx)
    }

    #[test]
    fn azure_hosts_select_azure_repos() {
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);

        for host in ["dev.azure.com", "contoso.visualstudio.com", "contoso.dev.azure.com"] {
            let req = request(&[("protocol", "https"), ("host", host)]);
            let provider = registry.select(&req, None).expect("select");
            assert_eq!(provider.id(), "azure-repos", "host {}", host);
        }
    }

    #[test]
    fn azure_matches_plain_http_too() {
        // Azure reports support for http so it can reject it loudly later.
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);
        let req = request(&[("protocol", "http"), ("host", "dev.azure.com")]);
        assert_eq!(registry.select(&req, None).expect("select").id(), "azure-repos");
    }

    #[test]
    fn github_hosts_select_github() {
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);

        for host in [
            "github.com",
            "GitHub.com",
            "gist.github.com",
            "github.example.com",
            "gist.github.example.com",
        ] {
            let req = request(&[("protocol", "https"), ("host", host)]);
            let provider = registry.select(&req, None).expect("select");
            assert_eq!(provider.id(), "github", "host {}", host);
        }
    }

    #[test]
    fn unknown_hosts_fall_back_to_generic() {
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);
        let req = request(&[("protocol", "https"), ("host", "git.example.com")]);
        assert_eq!(registry.select(&req, None).expect("select").id(), "generic");
    }

    #[test]
    fn forced_id_bypasses_matching() {
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);
        let req = request(&[("protocol", "https"), ("host", "github.com")]);
        let provider = registry.select(&req, Some("generic")).expect("select");
        assert_eq!(provider.id(), "generic");
    }

    #[test]
    fn forced_id_accepts_legacy_authority_names() {
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);
        let req = request(&[("protocol", "https"), ("host", "example.com")]);
        assert_eq!(registry.select(&req, Some("aad")).expect("select").id(), "azure-repos");
        assert_eq!(registry.select(&req, Some("basic")).expect("select").id(), "generic");
    }

    #[test]
    fn unknown_forced_id_is_fatal() {
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);
        let req = request(&[("protocol", "https"), ("host", "github.com")]);
        let err = registry.select(&req, Some("gitlab")).expect_err("should fail");
        assert!(matches!(err, Error::NoProvider(_)));
        assert!(err.to_string().contains("gitlab"));
    }

    #[test]
    fn provider_ids_are_distinct() {
        let dir = TempDir::new().expect("temp dir");
        let registry = registry(&dir);
        let ids: Vec<_> = registry.providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["azure-repos", "github", "generic"]);
    }
}
