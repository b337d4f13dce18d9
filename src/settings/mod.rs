//! settings
//!
//! The scoped settings resolver.
//!
//! # Resolution order
//!
//! Given a setting `credential.<property>` the resolver consults:
//!
//! 1. A registered environment variable ([`env::env_names`]).
//! 2. Git configuration for the current remote URL, trying increasingly
//!    general scopes (`credential.<url>.<property>` down to
//!    `credential.<property>`); the most specific match wins and ties
//!    favor the entry set later.
//! 3. The caller's default.
//!
//! The resolver is constructed once at process start and referenced
//! read-only from everywhere (no mutable globals).

mod env;
mod scope;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::git::GitConfig;
use crate::uri::RemoteUri;

pub use scope::{scope_score, split_name};

/// Interactive Microsoft authentication flow selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MsAuthFlow {
    /// Pick the best flow for the session (browser when available).
    #[default]
    Auto,
    /// Embedded web view (not available; treated as `Auto`).
    Embedded,
    /// System browser with a loopback redirect.
    System,
    /// Device-code flow.
    DeviceCode,
}

impl MsAuthFlow {
    /// Parse a flow selector.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Some(MsAuthFlow::Auto),
            "embedded" => Some(MsAuthFlow::Embedded),
            "system" => Some(MsAuthFlow::System),
            "devicecode" => Some(MsAuthFlow::DeviceCode),
            _ => None,
        }
    }
}

/// Read-only resolver over environment variables and Git configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    env: HashMap<String, String>,
    config: GitConfig,
}

impl Settings {
    /// Capture the process environment alongside a Git config snapshot.
    pub fn load(config: GitConfig) -> Self {
        Self {
            env: std::env::vars().collect(),
            config,
        }
    }

    /// Build from explicit parts (tests).
    pub fn from_parts(env: Vec<(String, String)>, config: GitConfig) -> Self {
        Self {
            env: env.into_iter().collect(),
            config,
        }
    }

    /// Resolve a `credential.<property>` setting.
    pub fn get(&self, property: &str, url: Option<&RemoteUri>) -> Option<String> {
        for name in env::env_names(property) {
            if let Some(value) = self.env.get(*name) {
                return Some(value.clone());
            }
        }
        self.config_value(property, url)
    }

    fn config_value(&self, property: &str, url: Option<&RemoteUri>) -> Option<String> {
        let mut best: Option<(u32, String)> = None;
        for (name, value) in self.config.iter() {
            let Some((entry_scope, entry_property)) = scope::split_name(name) else {
                continue;
            };
            if !entry_property.eq_ignore_ascii_case(property) {
                continue;
            }
            let score = match (entry_scope, url) {
                (None, _) => 0,
                (Some(s), Some(url)) => match scope::scope_score(s, url) {
                    Some(score) => score,
                    None => continue,
                },
                // Scoped entries never apply without a URL to match.
                (Some(_), None) => continue,
            };
            // `>=` so the later of two equally specific entries wins.
            if best.as_ref().map_or(true, |(b, _)| score >= *b) {
                best = Some((score, value.to_string()));
            }
        }
        best.map(|(_, v)| v)
    }

    /// Resolve a boolean setting. Unrecognized values fall back to
    /// `default`.
    pub fn get_bool(&self, property: &str, url: Option<&RemoteUri>, default: bool) -> bool {
        match self.get(property, url) {
            Some(value) => parse_bool(&value).unwrap_or(default),
            None => default,
        }
    }

    // ------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------

    /// Whether interactive prompts are permitted.
    pub fn interactive_allowed(&self, url: Option<&RemoteUri>) -> bool {
        self.get_bool("interactive", url, true)
    }

    /// A forced provider id, if configured.
    pub fn provider_override(&self, url: Option<&RemoteUri>) -> Option<String> {
        self.get("provider", url).filter(|v| !v.is_empty())
    }

    /// Configured GitHub authentication modes, if any.
    pub fn github_auth_modes(&self, url: Option<&RemoteUri>) -> Option<Vec<String>> {
        let raw = self.get("gitHubAuthModes", url)?;
        let modes: Vec<String> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if modes.is_empty() {
            None
        } else {
            Some(modes)
        }
    }

    /// Credential-store key namespace (defaults to `git`).
    pub fn namespace(&self) -> String {
        self.get("namespace", None)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| crate::vault::DEFAULT_NAMESPACE.to_string())
    }

    /// Selected credential-store backend name, if any.
    pub fn credential_backend(&self) -> Option<String> {
        self.get("credentialStore", None).filter(|v| !v.is_empty())
    }

    /// Directory for the plaintext store, if configured.
    pub fn plaintext_store_path(&self) -> Option<PathBuf> {
        self.get("plaintextStorePath", None)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Interactive Microsoft authentication flow.
    pub fn msauth_flow(&self) -> MsAuthFlow {
        self.get("msauthFlow", None)
            .and_then(|v| MsAuthFlow::parse(&v))
            .unwrap_or_default()
    }

    /// Whether credentials are scoped by HTTP path for this remote.
    pub fn use_http_path(&self, url: Option<&RemoteUri>) -> bool {
        self.get_bool("useHttpPath", url, false)
    }

    /// Whether Windows integrated authentication may be offered.
    pub fn allow_windows_auth(&self, url: Option<&RemoteUri>) -> bool {
        self.get_bool("allowWindowsAuth", url, true)
    }

    /// Azure Repos credential type (`oauth` or `pat`).
    pub fn azrepos_credential_type(&self, url: Option<&RemoteUri>) -> Option<String> {
        self.get("azreposCredentialType", url)
            .map(|v| v.to_ascii_lowercase())
    }

    /// Proxy URL for the helper's HTTP traffic, if configured.
    pub fn http_proxy(&self, url: Option<&RemoteUri>) -> Option<String> {
        self.get("httpProxy", url).filter(|v| !v.is_empty())
    }

    /// Whether tracing is enabled.
    pub fn trace_enabled(&self) -> bool {
        self.get_bool("trace", None, false)
    }

    /// Whether secrets may appear in trace output.
    pub fn trace_secrets(&self) -> bool {
        self.get_bool("traceSecrets", None, false)
    }
}

/// Parse the boolean vocabulary shared with Git.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
