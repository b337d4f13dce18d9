//! providers::github
//!
//! GitHub host provider.
//!
//! # Authentication modes
//!
//! Four modes exist: `basic` (username/password prompt), `oauth` (browser
//! authorization-code), `devcode` (device-code), and `pat` (prompt for a
//! personal access token). `credential.gitHubAuthModes` restricts the set;
//! with no configuration every mode is eligible and the provider picks the
//! best one for the session: browser OAuth on an interactive desktop,
//! device-code otherwise, then PAT/basic prompts.
//!
//! # Host handling
//!
//! `gist.<host>` is normalized to `<host>` before storage so gist and main
//! credentials share a key.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::oauth::{self, Endpoints, OAuthClient, RefreshOutcome, RefreshLock, TokenResult};
use crate::protocol::Request;
use crate::settings::Settings;
use crate::ui::{trace, Prompter};
use crate::uri::RemoteUri;
use crate::vault::{Credential, CredentialVault};

use super::{desktop_session_available, ProviderContext};

/// OAuth client id registered for the helper.
pub const GITHUB_CLIENT_ID: &str = "0120e057bd645470c1ed";

/// Scopes requested for Git operations.
pub const GITHUB_SCOPES: &[&str] = &["repo", "gist", "workflow"];

/// One GitHub authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Username/password (or PAT typed as a password).
    Basic,
    /// Browser authorization-code flow.
    OAuth,
    /// Device-code flow.
    DeviceCode,
    /// Prompt for a personal access token.
    Pat,
}

impl AuthMode {
    /// Parse one mode name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "basic" => Some(AuthMode::Basic),
            "oauth" | "browser" => Some(AuthMode::OAuth),
            "devcode" | "device" => Some(AuthMode::DeviceCode),
            "pat" => Some(AuthMode::Pat),
            _ => None,
        }
    }
}

/// GitHub provider.
pub struct GitHubProvider {
    settings: Arc<Settings>,
    vault: Arc<CredentialVault>,
    prompter: Arc<dyn Prompter>,
    http: reqwest::Client,
}

impl GitHubProvider {
    /// Create the provider from shared collaborators.
    pub fn new(ctx: &ProviderContext) -> Self {
        let proxy = ctx.settings.http_proxy(None);
        let http = oauth::http_client(proxy.as_deref()).unwrap_or_else(|err| {
            trace::trace(format!("falling back to a direct HTTP client: {}", err));
            reqwest::Client::new()
        });
        Self {
            settings: ctx.settings.clone(),
            vault: ctx.vault.clone(),
            prompter: ctx.prompter.clone(),
            http,
        }
    }

    /// Match predicate: dotcom, gist, or a `github.`-labelled host.
    pub fn is_supported(&self, request: &Request) -> bool {
        match (request.protocol(), request.host()) {
            (Some("http") | Some("https"), Some(host)) => is_github_host(host),
            _ => false,
        }
    }

    fn normalized_uri(&self, request: &Request) -> Result<RemoteUri> {
        let mut uri = request
            .remote_uri()
            .ok_or_else(|| Error::MalformedInput("request does not form a remote URL".into()))?;
        uri.host = normalized_host(&uri.host);
        Ok(uri)
    }

    fn service_for(&self, uri: &RemoteUri) -> String {
        self.vault
            .service_for(uri, self.settings.use_http_path(Some(uri)))
    }

    fn refresh_service(&self, host: &str) -> String {
        self.vault
            .service_for_label(&format!("github/refresh-token:{}", host))
    }

    /// Serve a `get`.
    pub async fn get(&self, request: &Request) -> Result<Option<Credential>> {
        let uri = self.normalized_uri(request)?;
        let service = self.service_for(&uri);

        if let Some(credential) = self.vault.get(&service, request.username())? {
            return Ok(Some(credential));
        }

        let host = uri.host.clone();
        if let Some(credential) = self.try_refresh(&host).await? {
            return Ok(Some(credential));
        }

        let interactive = self.settings.interactive_allowed(Some(&uri));
        let modes = self.resolve_modes(&uri);
        let mode = choose_mode(&modes, interactive, desktop_session_available())?;
        trace::trace(format!("acquiring GitHub credential via {:?}", mode));

        let credential = match mode {
            AuthMode::OAuth => {
                let client = self.oauth_client(&host)?;
                let token = oauth::auth_code::authorize(&client, GITHUB_SCOPES, &[]).await?;
                self.credential_from_token(&host, token).await?
            }
            AuthMode::DeviceCode => {
                let client = self.oauth_client(&host)?;
                let token =
                    oauth::device::authorize(&client, GITHUB_SCOPES, self.prompter.as_ref())
                        .await?;
                self.credential_from_token(&host, token).await?
            }
            AuthMode::Pat => {
                let pat = self.prompter.ask_secret("Personal access token")?;
                let username = match self.fetch_login(&host, &pat).await {
                    Ok(login) => login,
                    Err(_) => request.username().unwrap_or("git").to_string(),
                };
                Credential::new(username, pat)
            }
            AuthMode::Basic => {
                let answer = self
                    .prompter
                    .ask_basic(&uri.canonical(false), request.username())?;
                Credential::new(answer.username, answer.password)
            }
        };

        Ok(Some(credential))
    }

    /// Attempt a refresh-token exchange; `Ok(None)` falls through to the
    /// interactive ladder.
    async fn try_refresh(&self, host: &str) -> Result<Option<Credential>> {
        let refresh_service = self.refresh_service(host);
        if self.vault.get(&refresh_service, None)?.is_none() {
            return Ok(None);
        }

        let client = self.oauth_client(host)?;
        let _lock = RefreshLock::acquire(
            &format!("github:{}", host),
            oauth::DEFAULT_LOCK_TIMEOUT,
        )?;

        // Re-read after acquiring the lock; another process may have
        // rotated the token already.
        let Some(stored) = self.vault.get(&refresh_service, None)? else {
            return Ok(None);
        };

        match client.refresh(stored.secret(), GITHUB_SCOPES).await? {
            RefreshOutcome::Refreshed(token) => {
                let username = stored.username.clone();
                self.persist_refresh_token(host, &username, &token)?;
                Ok(Some(Credential::new(username, token.access_token)))
            }
            RefreshOutcome::RequiresInteraction => {
                trace::trace("stored GitHub refresh token is dead");
                self.vault.remove(&refresh_service, None)?;
                Ok(None)
            }
        }
    }

    fn resolve_modes(&self, uri: &RemoteUri) -> Vec<AuthMode> {
        match self.settings.github_auth_modes(Some(uri)) {
            Some(names) => names
                .iter()
                .filter_map(|name| AuthMode::parse(name))
                .collect(),
            None => vec![
                AuthMode::OAuth,
                AuthMode::DeviceCode,
                AuthMode::Pat,
                AuthMode::Basic,
            ],
        }
    }

    fn oauth_client(&self, host: &str) -> Result<OAuthClient> {
        OAuthClient::with_proxy(
            GITHUB_CLIENT_ID,
            Endpoints::github(host),
            self.settings.http_proxy(None).as_deref(),
        )
    }

    /// Turn an OAuth token into a credential, resolving the account login
    /// and persisting the rotated refresh token.
    async fn credential_from_token(&self, host: &str, token: TokenResult) -> Result<Credential> {
        let login = self.fetch_login(host, &token.access_token).await?;
        self.persist_refresh_token(host, &login, &token)?;
        Ok(Credential::new(login, token.access_token))
    }

    fn persist_refresh_token(&self, host: &str, login: &str, token: &TokenResult) -> Result<()> {
        if let Some(refresh_token) = &token.refresh_token {
            self.vault.add_or_update(
                &self.refresh_service(host),
                &Credential::new(login, refresh_token.clone()),
            )?;
        }
        Ok(())
    }

    /// Look up the authenticated user's login.
    async fn fetch_login(&self, host: &str, access_token: &str) -> Result<String> {
        let url = format!("{}/user", api_base(host));
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AuthFailed(format!(
                "GitHub user lookup answered {}",
                status
            )));
        }

        let user: UserInfo = response.json().await?;
        Ok(user.login)
    }

    /// Persist a validated credential.
    pub fn store(&self, request: &Request) -> Result<()> {
        let uri = self.normalized_uri(request)?;
        let (Some(username), Some(password)) = (request.username(), request.password()) else {
            return Ok(());
        };
        self.vault
            .add_or_update(&self.service_for(&uri), &Credential::new(username, password))
    }

    /// Drop a rejected credential and any refresh token alongside it.
    pub fn erase(&self, request: &Request) -> Result<()> {
        let uri = self.normalized_uri(request)?;
        self.vault
            .remove(&self.service_for(&uri), request.username())?;
        self.vault
            .remove(&self.refresh_service(&uri.host), request.username())
    }
}

/// User info from the GitHub API.
#[derive(Debug, Clone, Deserialize)]
struct UserInfo {
    login: String,
}

/// Whether a host belongs to GitHub (dotcom, gist, or enterprise).
pub(crate) fn is_github_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let host = host.split(':').next().unwrap_or(&host);
    if host == "github.com" || host == "gist.github.com" {
        return true;
    }
    let labels: Vec<&str> = host.split('.').collect();
    match labels.as_slice() {
        [first, rest @ ..] if *first == "github" && !rest.is_empty() => true,
        [first, second, rest @ ..] if *first == "gist" && *second == "github" && !rest.is_empty() => {
            true
        }
        _ => false,
    }
}

/// Strip a `gist.` label so gist and main credentials share a key.
pub(crate) fn normalized_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    match lower.strip_prefix("gist.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Base URL of the REST API for a host.
fn api_base(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{}/api/v3", host)
    }
}

/// Pick the mode to run, given the allowed set and the session shape.
fn choose_mode(modes: &[AuthMode], interactive: bool, desktop: bool) -> Result<AuthMode> {
    if !interactive {
        return Err(Error::InteractionDisabled);
    }
    if modes.contains(&AuthMode::OAuth) && desktop {
        return Ok(AuthMode::OAuth);
    }
    if modes.contains(&AuthMode::DeviceCode) {
        return Ok(AuthMode::DeviceCode);
    }
    if modes.contains(&AuthMode::Pat) {
        return Ok(AuthMode::Pat);
    }
    if modes.contains(&AuthMode::Basic) {
        return Ok(AuthMode::Basic);
    }
    Err(Error::AuthFailed(
        "no usable GitHub authentication mode is enabled".into(),
    ))
}
