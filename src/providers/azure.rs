//! providers::azure
//!
//! Azure Repos host provider.
//!
//! # Flow for a `get`
//!
//! 1. Reject plain HTTP before any network call.
//! 2. Derive the organization from the host or the first path segment.
//! 3. Resolve the OAuth authority: cached, or discovered with an
//!    unauthenticated HEAD against the organization URL.
//! 4. Resolve the effective signed-in user (remote-level binding beats the
//!    organization-level one; an explicit sign-out suppresses both).
//! 5. Acquire an Azure AD access token: refresh first when a refresh token
//!    is stored, interactive (browser or device-code) otherwise.
//! 6. Return `(upn, access_token)`, or exchange the token for a personal
//!    access token when the organization is configured for PAT mode.
//!
//! `store`/`erase` carry Git's verdict on the credential back into the
//! sign-in cache (see [`crate::azure::cache`]).

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;

use crate::azure::{authority, org, AzureReposCache};
use crate::error::{Error, Result};
use crate::oauth::{self, Endpoints, OAuthClient, RefreshOutcome, RefreshLock, TokenResult};
use crate::protocol::Request;
use crate::settings::{MsAuthFlow, Settings};
use crate::ui::{trace, Prompter};
use crate::uri::RemoteUri;
use crate::vault::{Credential, CredentialVault};

use super::{desktop_session_available, ProviderContext};

/// Azure AD public client id the helper authenticates as.
pub const AZURE_CLIENT_ID: &str = "872cd9fa-32aa-416a-aac5-53bca58e7e52";

/// Azure DevOps resource scope.
pub const AZURE_DEVOPS_SCOPE: &str = "499b84ac-1321-427f-aa17-267ca6975798/.default";

/// OpenID scopes requested alongside the resource so the id_token names
/// the account.
const OIDC_SCOPES: &[&str] = &["openid", "profile", "email", "offline_access"];

/// Username presented with a minted personal access token.
pub const PAT_USERNAME: &str = "PersonalAccessToken";

/// Scopes requested when minting a PAT.
const PAT_SCOPES: &str = "vso.code_write vso.packaging";

/// Azure Repos provider.
pub struct AzureReposProvider {
    settings: Arc<Settings>,
    vault: Arc<CredentialVault>,
    prompter: Arc<dyn Prompter>,
    cache: Arc<Mutex<AzureReposCache>>,
    http: reqwest::Client,
}

impl AzureReposProvider {
    /// Create the provider from shared collaborators (the cache handle is
    /// injected, never constructed here).
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
            cache: ctx.azure_cache.clone(),
            http,
        }
    }

    /// Match predicate. Plain `http` is accepted here so the provider can
    /// reject it with a clear error instead of falling through to generic.
    pub fn is_supported(&self, request: &Request) -> bool {
        match (request.protocol(), request.host()) {
            (Some("http") | Some("https"), Some(host)) => {
                org::is_azure_host(host.split(':').next().unwrap_or(host))
            }
            _ => false,
        }
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, AzureReposCache>> {
        self.cache
            .lock()
            .map_err(|_| Error::Internal("sign-in cache lock poisoned".into()))
    }

    fn remote_and_org(&self, request: &Request) -> Result<(RemoteUri, String)> {
        let uri = request
            .remote_uri()
            .ok_or_else(|| Error::MalformedInput("request does not form a remote URL".into()))?;
        let org = org::organization_from(&uri).ok_or_else(|| {
            Error::Internal(format!(
                "cannot determine Azure DevOps organization from '{}'",
                uri
            ))
        })?;
        Ok((uri, org))
    }

    fn service_for(&self, uri: &RemoteUri) -> String {
        self.vault
            .service_for(uri, self.settings.use_http_path(Some(uri)))
    }

    fn refresh_service(&self, org_name: &str) -> String {
        self.vault
            .service_for_label(&format!("azrepos/refresh-token:{}", org_name))
    }

    /// Serve a `get`.
    pub async fn get(&self, request: &Request) -> Result<Option<Credential>> {
        if request.protocol() == Some("http") {
            return Err(Error::UnsupportedProtocol(
                "Unencrypted HTTP is not supported for Azure Repos. Use HTTPS.".into(),
            ));
        }

        let (uri, org_name) = self.remote_and_org(request)?;
        let service = self.service_for(&uri);
        if let Some(credential) = self.vault.get(&service, request.username())? {
            return Ok(Some(credential));
        }

        let cached_authority = self.lock_cache()?.get_authority(&org_name);
        let authority = match cached_authority {
            Some(authority) => authority,
            None => {
                let discovered = self.discover_authority(&uri, &org_name).await?;
                self.lock_cache()?
                    .update_authority(&org_name, &discovered)?;
                discovered
            }
        };
        trace::trace(format!("authority for '{}' is {}", org_name, authority));

        let user = { self.lock_cache()?.effective_user(&org_name, &uri) };
        let client = OAuthClient::with_proxy(
            AZURE_CLIENT_ID,
            Endpoints::azure_ad(&authority),
            self.settings.http_proxy(Some(&uri)).as_deref(),
        )?;
        let scopes = devops_scopes();

        let token = self
            .acquire_token(&client, &scopes, &org_name, user.as_deref(), &uri)
            .await?;

        let username = token
            .account
            .clone()
            .or(user)
            .unwrap_or_else(|| "AzureReposUser".to_string());
        self.persist_refresh_token(&org_name, &username, &token)?;

        if self.settings.azrepos_credential_type(Some(&uri)).as_deref() == Some("pat") {
            let pat = self.create_pat(&org_name, &token.access_token).await?;
            return Ok(Some(Credential::new(PAT_USERNAME, pat)));
        }

        Ok(Some(Credential::new(username, token.access_token)))
    }

    /// Acquire an access token: stored refresh token first, interactive
    /// flows second.
    async fn acquire_token(
        &self,
        client: &OAuthClient,
        scopes: &[&str],
        org_name: &str,
        user: Option<&str>,
        uri: &RemoteUri,
    ) -> Result<TokenResult> {
        if let Some(token) = self.try_refresh(client, scopes, org_name, user).await? {
            return Ok(token);
        }

        if !self.settings.interactive_allowed(Some(uri)) {
            return Err(Error::InteractionDisabled);
        }

        let flow = self.settings.msauth_flow();
        let use_browser = match flow {
            MsAuthFlow::System => true,
            MsAuthFlow::DeviceCode => false,
            // The embedded web view lives behind the GUI seam; treat it as auto.
            MsAuthFlow::Auto | MsAuthFlow::Embedded => desktop_session_available(),
        };

        if use_browser {
            let hint: Vec<(&str, &str)> = match user {
                Some(user) => vec![("login_hint", user)],
                None => Vec::new(),
            };
            oauth::auth_code::authorize(client, scopes, &hint).await
        } else {
            oauth::device::authorize(client, scopes, self.prompter.as_ref()).await
        }
    }

    async fn try_refresh(
        &self,
        client: &OAuthClient,
        scopes: &[&str],
        org_name: &str,
        user: Option<&str>,
    ) -> Result<Option<TokenResult>> {
        let refresh_service = self.refresh_service(org_name);
        if self.vault.get(&refresh_service, user)?.is_none() {
            return Ok(None);
        }

        let _lock = RefreshLock::acquire(
            &format!("azrepos:{}", org_name),
            oauth::DEFAULT_LOCK_TIMEOUT,
        )?;

        // Re-read under the lock; refresh tokens rotate.
        let Some(stored) = self.vault.get(&refresh_service, user)? else {
            return Ok(None);
        };

        match client.refresh(stored.secret(), scopes).await? {
            RefreshOutcome::Refreshed(token) => Ok(Some(token)),
            RefreshOutcome::RequiresInteraction => {
                trace::trace("stored Azure refresh token is dead");
                self.vault.remove(&refresh_service, None)?;
                Ok(None)
            }
        }
    }

    fn persist_refresh_token(
        &self,
        org_name: &str,
        username: &str,
        token: &TokenResult,
    ) -> Result<()> {
        if let Some(refresh_token) = &token.refresh_token {
            self.vault.add_or_update(
                &self.refresh_service(org_name),
                &Credential::new(username, refresh_token.clone()),
            )?;
        }
        Ok(())
    }

    /// Probe the organization URL and read the authority from the answer's
    /// headers.
    async fn discover_authority(&self, uri: &RemoteUri, org_name: &str) -> Result<String> {
        let url = org::organization_url(uri, org_name);
        trace::trace(format!("discovering authority via {}", url));

        let response = self.http.head(&url).send().await?;

        let challenges: Vec<&str> = response
            .headers()
            .get_all(reqwest::header::WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let tenants: Vec<&str> = response
            .headers()
            .get_all("x-vss-resourcetenant")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        Ok(authority::resolve_authority(&challenges, &tenants))
    }

    /// Exchange a bearer token for a personal access token via the Azure
    /// DevOps PAT API.
    async fn create_pat(&self, org_name: &str, access_token: &str) -> Result<String> {
        let url = format!(
            "https://vssps.dev.azure.com/{}/_apis/tokens/pats?api-version=7.1-preview.1",
            org_name
        );
        let body = serde_json::json!({
            "displayName": format!("git: {} on {}", org_name, hostname()),
            "scope": PAT_SCOPES,
            "allOrgs": false,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AuthFailed(format!(
                "personal access token creation answered {}",
                status
            )));
        }

        let created: PatCreateResponse = response.json().await?;
        Ok(created.pat_token.token)
    }

    /// Persist a validated credential and record the sign-in.
    pub fn store(&self, request: &Request) -> Result<()> {
        let (uri, org_name) = self.remote_and_org(request)?;
        let (Some(username), Some(password)) = (request.username(), request.password()) else {
            return Ok(());
        };

        self.vault
            .add_or_update(&self.service_for(&uri), &Credential::new(username, password))?;
        self.lock_cache()?
            .handle_credential_stored(&org_name, &uri, username)
    }

    /// Drop a rejected credential, mark the remote signed out, and forget
    /// the (possibly stale) authority.
    pub fn erase(&self, request: &Request) -> Result<()> {
        let (uri, org_name) = self.remote_and_org(request)?;
        self.vault
            .remove(&self.service_for(&uri), request.username())?;
        self.lock_cache()?
            .handle_credential_erased(&org_name, &uri)
    }
}

/// Scopes for an Azure DevOps token request.
fn devops_scopes() -> Vec<&'static str> {
    let mut scopes = vec![AZURE_DEVOPS_SCOPE];
    scopes.extend_from_slice(OIDC_SCOPES);
    scopes
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string())
}

#[derive(Debug, Deserialize)]
struct PatCreateResponse {
    #[serde(rename = "patToken")]
    pat_token: PatToken,
}

#[derive(Debug, Deserialize)]
struct PatToken {
    token: String,
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use tempfile::TempDir;

    fn provider(dir: &TempDir) -> (AzureReposProvider, ProviderContext) {
        let ctx = context(dir, Arc::new(ScriptedPrompter::refusing()));
        (AzureReposProvider::new(&ctx), ctx)
    }

    #[test]
    fn devops_scopes_lead_with_resource() {
        let scopes = devops_scopes();
        assert_eq!(scopes[0], AZURE_DEVOPS_SCOPE);
        assert!(scopes.contains(&"offline_access"));
    }

    #[test]
    fn pat_response_deserializes() {
        let json = r#"{"patToken":{"token":"pat-secret","displayName":"git"}}"#;
        let parsed: PatCreateResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed.pat_token.token, "pat-secret");
    }

    #[tokio::test]
    async fn plain_http_is_rejected_before_anything_else() {
        let dir = TempDir::new().expect("temp dir");
        let (provider, _ctx) = provider(&dir);

        let req = request(&[
            ("protocol", "http"),
            ("host", "dev.azure.com"),
            ("path", "contoso/_git/widgets"),
        ]);
        let err = provider.get(&req).await.expect_err("should fail");
        match err {
            Error::UnsupportedProtocol(msg) => {
                assert!(msg.contains("Unencrypted HTTP is not supported for Azure Repos"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_serves_stored_credential_without_network() {
        let dir = TempDir::new().expect("temp dir");
        let (provider, ctx) = provider(&dir);

        ctx.vault
            .add_or_update(
                "git:https://dev.azure.com",
                &Credential::new("alice@contoso.com", "token"),
            )
            .expect("seed");

        let req = request(&[
            ("protocol", "https"),
            ("host", "dev.azure.com"),
            ("path", "contoso/_git/widgets"),
        ]);
        let credential = provider.get(&req).await.expect("get").expect("credential");
        assert_eq!(credential.username, "alice@contoso.com");
    }

    #[tokio::test]
    async fn store_records_org_sign_in() {
        let dir = TempDir::new().expect("temp dir");
        let (provider, ctx) = provider(&dir);

        let req = request(&[
            ("protocol", "https"),
            ("host", "dev.azure.com"),
            ("path", "contoso/_git/widgets"),
            ("username", "alice@contoso.com"),
            ("password", "secret"),
        ]);
        provider.store(&req).expect("store");

        let mut cache = ctx.azure_cache.lock().unwrap();
        assert_eq!(
            cache.get_org_user("contoso"),
            Some("alice@contoso.com".to_string())
        );
    }

    #[tokio::test]
    async fn erase_marks_remote_signed_out_and_drops_authority() {
        let dir = TempDir::new().expect("temp dir");
        let (provider, ctx) = provider(&dir);
        let uri = RemoteUri::parse("https://dev.azure.com/contoso/_git/widgets").expect("uri");

        {
            let mut cache = ctx.azure_cache.lock().unwrap();
            cache.sign_in_org("contoso", "alice@contoso.com").expect("org");
            cache
                .update_authority("contoso", "https://login.microsoftonline.com/T1")
                .expect("authority");
        }

        let req = request(&[
            ("protocol", "https"),
            ("host", "dev.azure.com"),
            ("path", "contoso/_git/widgets"),
        ]);
        provider.erase(&req).expect("erase");

        let mut cache = ctx.azure_cache.lock().unwrap();
        assert_eq!(cache.get_remote_user(&uri), Some(String::new()));
        assert_eq!(cache.effective_user("contoso", &uri), None);
        assert_eq!(cache.get_authority("contoso"), None);
    }

    #[tokio::test]
    async fn org_is_required() {
        let dir = TempDir::new().expect("temp dir");
        let (provider, _ctx) = provider(&dir);

        let req = request(&[("protocol", "https"), ("host", "dev.azure.com")]);
        let err = provider.get(&req).await.expect_err("should fail");
        assert!(err.to_string().contains("organization"));
    }
}
