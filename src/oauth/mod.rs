//! oauth
//!
//! OAuth 2.0 client flows.
//!
//! # Flows
//!
//! - [`auth_code`] - authorization code with PKCE over a loopback redirect
//!   and the system browser
//! - [`device`] - device-code flow for headless sessions
//! - refresh ([`OAuthClient::refresh`]) - exchange a stored refresh token,
//!   signalling the caller to go interactive when the token is dead
//!
//! # Transport policy
//!
//! Every HTTP call carries a 30 second deadline. Network-level failures and
//! 5xx answers are retried with exponential backoff up to three attempts
//! before surfacing as `Transient`. 4xx answers are parsed as OAuth error
//! bodies and never retried.
//!
//! Each flow is single-shot: PKCE verifier, state, and nonce are dropped as
//! soon as a token or a terminal error is produced.

pub mod auth_code;
pub mod device;
mod lock;
pub mod pkce;

use std::fmt;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ui::trace;

pub use lock::{RefreshLock, DEFAULT_LOCK_TIMEOUT};

/// Per-request HTTP deadline.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry budget for transient transport failures.
const RETRY_ATTEMPTS: u32 = 3;

/// Fallback token lifetime when the server omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Endpoint set for one authority.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Authorization endpoint (browser flow).
    pub authorization: String,
    /// Token endpoint.
    pub token: String,
    /// Device-authorization endpoint.
    pub device_authorization: String,
}

impl Endpoints {
    /// Endpoints for an Azure AD authority (`https://login.microsoftonline.com/<tenant>`).
    pub fn azure_ad(authority: &str) -> Self {
        let base = authority.trim_end_matches('/');
        Self {
            authorization: format!("{}/oauth2/v2.0/authorize", base),
            token: format!("{}/oauth2/v2.0/token", base),
            device_authorization: format!("{}/oauth2/v2.0/devicecode", base),
        }
    }

    /// Endpoints for a GitHub host (dotcom or GitHub Enterprise).
    pub fn github(host: &str) -> Self {
        Self {
            authorization: format!("https://{}/login/oauth/authorize", host),
            token: format!("https://{}/login/oauth/access_token", host),
            device_authorization: format!("https://{}/login/device/code", host),
        }
    }
}

/// The outcome of a successful token request.
#[derive(Clone)]
pub struct TokenResult {
    /// Opaque bearer token.
    pub access_token: String,
    /// Rotated refresh token, when the server issued one.
    pub refresh_token: Option<String>,
    /// Absolute expiry instant of the access token.
    pub expires_at: DateTime<Utc>,
    /// Raw OpenID Connect id_token, when the scopes requested one.
    pub id_token: Option<String>,
    /// Account identifier derived from the id_token claims.
    pub account: Option<String>,
}

// Custom Debug to keep tokens out of trace output.
impl fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResult")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("account", &self.account)
            .finish()
    }
}

/// Outcome of a refresh attempt.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A fresh token was issued.
    Refreshed(TokenResult),
    /// The refresh token is dead; the caller must go interactive.
    RequiresInteraction,
}

/// Wire shape of a token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    #[allow(dead_code)]
    scope: Option<String>,
    id_token: Option<String>,
}

/// Wire shape of an OAuth error body.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorResponse {
    pub(crate) error: String,
    pub(crate) error_description: Option<String>,
}

impl TokenResponse {
    fn into_result(self) -> TokenResult {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let account = self.id_token.as_deref().and_then(account_from_id_token);
        TokenResult {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
            id_token: self.id_token,
            account,
        }
    }
}

/// OAuth 2.0 client bound to one authority's endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    endpoints: Endpoints,
}

/// Build the helper's standard HTTP client (deadline, user agent, and the
/// configured proxy, if any).
pub fn http_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(crate::USER_AGENT);
    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| Error::Internal(format!("invalid proxy URL: {}", e)))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| Error::Internal(format!("cannot build HTTP client: {}", e)))
}

impl OAuthClient {
    /// Create a client for `client_id` against `endpoints`.
    pub fn new(client_id: &str, endpoints: Endpoints) -> Result<Self> {
        Self::with_proxy(client_id, endpoints, None)
    }

    /// Create a client routing through a proxy.
    pub fn with_proxy(client_id: &str, endpoints: Endpoints, proxy: Option<&str>) -> Result<Self> {
        Ok(Self {
            http: http_client(proxy)?,
            client_id: client_id.to_string(),
            endpoints,
        })
    }

    /// The registered client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The endpoint set this client talks to.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// POST a form to `url`, retrying transient failures with exponential
    /// backoff, and return the response body.
    pub(crate) async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut delay = Duration::from_secs(1);
        let mut last_error = None;

        for attempt in 1..=RETRY_ATTEMPTS {
            let response = self
                .http
                .post(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .form(params)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_server_error() => {
                    last_error = Some(Error::Transient(format!(
                        "{} answered {}",
                        url,
                        response.status()
                    )));
                }
                Ok(response) => {
                    return response.text().await.map_err(Error::from);
                }
                Err(e) => {
                    last_error = Some(Error::Transient(e.to_string()));
                }
            }

            if attempt < RETRY_ATTEMPTS {
                trace::trace(format!(
                    "transient failure talking to {} (attempt {}/{})",
                    url, attempt, RETRY_ATTEMPTS
                ));
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Transient("request failed".into())))
    }

    /// Parse a token-endpoint body into a result or an error.
    pub(crate) fn parse_token_body(body: &str) -> Result<TokenResult> {
        if let Ok(token) = serde_json::from_str::<TokenResponse>(body) {
            return Ok(token.into_result());
        }
        if let Ok(err) = serde_json::from_str::<OAuthErrorResponse>(body) {
            return Err(Error::AuthFailed(format!(
                "{}: {}",
                err.error,
                err.error_description.unwrap_or_default()
            )));
        }
        Err(Error::AuthFailed("unrecognized token response".into()))
    }

    /// Exchange an authorization code (with its PKCE verifier) for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResult> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];
        let body = self.post_form(&self.endpoints.token, &params).await?;
        Self::parse_token_body(&body)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// `invalid_grant` (or any other 4xx naming the grant) means the
    /// refresh token is dead; the caller falls back to interactive.
    pub async fn refresh(&self, refresh_token: &str, scopes: &[&str]) -> Result<RefreshOutcome> {
        let scope = scopes.join(" ");
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];
        let body = self.post_form(&self.endpoints.token, &params).await?;

        if let Ok(token) = serde_json::from_str::<TokenResponse>(&body) {
            return Ok(RefreshOutcome::Refreshed(token.into_result()));
        }
        if let Ok(err) = serde_json::from_str::<OAuthErrorResponse>(&body) {
            trace::trace(format!("refresh rejected: {}", err.error));
            return Ok(RefreshOutcome::RequiresInteraction);
        }
        Err(Error::AuthFailed("unrecognized refresh response".into()))
    }
}

/// Derive an account identifier from id_token claims.
///
/// The payload is decoded without signature verification; the token came
/// straight from the issuer over TLS and is only used for display and
/// cache-key purposes.
pub fn account_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let payload = payload.trim_end_matches('=');
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    for claim in ["preferred_username", "upn", "email"] {
        if let Some(value) = claims.get(claim).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
