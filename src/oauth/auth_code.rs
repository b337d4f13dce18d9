//! oauth::auth_code
//!
//! Authorization-code flow with PKCE over a loopback redirect.
//!
//! # Flow
//!
//! 1. Bind a loopback listener on an ephemeral port and derive
//!    `http://127.0.0.1:<port>/<random-path>` as the redirect URI.
//! 2. Generate the PKCE verifier/challenge and a `state` nonce.
//! 3. Open the authorization URL in the user's default browser.
//! 4. Accept exactly one GET on the random path; other paths get 404 and
//!    anything after the first accepted redirect is ignored.
//! 5. Validate `state`, then exchange the code (with the verifier) at the
//!    token endpoint.
//!
//! The whole interactive wait runs under an outer deadline; exceeding it
//! (or closing the browser tab on the provider's cancel page) surfaces as
//! `Canceled`.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::{pkce, OAuthClient, TokenResult};
use crate::error::{Error, Result};
use crate::ui::trace;

/// Outer deadline for the interactive browser wait.
pub const FLOW_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Small page shown in the browser after a successful sign-in.
const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><body>\
    <h1>Authentication complete</h1>\
    <p>You may close this tab and return to Git.</p></body></html>";

/// Page shown when the authorization server reported an error.
const FAILURE_PAGE: &str = "<!DOCTYPE html><html><body>\
    <h1>Authentication failed</h1>\
    <p>Return to Git for details.</p></body></html>";

/// Run the authorization-code flow and return the token result.
///
/// `extra_params` is appended to the authorization URL (e.g. a `nonce` or
/// a tenant hint).
pub async fn authorize(
    client: &OAuthClient,
    scopes: &[&str],
    extra_params: &[(&str, &str)],
) -> Result<TokenResult> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| Error::Internal(format!("cannot bind loopback listener: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| Error::Internal(format!("cannot read listener address: {}", e)))?
        .port();

    let path = format!("/{}", pkce::random_hex(16));
    let redirect_uri = format!("http://127.0.0.1:{}{}", port, path);

    let verifier = pkce::code_verifier();
    let challenge = pkce::code_challenge(&verifier);
    let state = pkce::state_nonce();
    let nonce = pkce::state_nonce();

    let mut params: Vec<(&str, &str)> = vec![
        ("response_type", "code"),
        ("client_id", client.client_id()),
        ("redirect_uri", &redirect_uri),
        ("state", &state),
        ("code_challenge", &challenge),
        ("code_challenge_method", "S256"),
        ("nonce", &nonce),
    ];
    let scope = scopes.join(" ");
    if !scope.is_empty() {
        params.push(("scope", &scope));
    }
    params.extend(extra_params.iter().copied());

    let auth_url = build_url(&client.endpoints().authorization, &params);
    trace::trace("opening system browser for authorization");
    if let Err(e) = open::that(&auth_url) {
        // The flow can still complete if the user opens the URL by hand.
        eprintln!("warning: cannot open browser: {}", e);
        eprintln!("Visit this URL to continue: {}", auth_url);
    }

    let code = tokio::time::timeout(FLOW_TIMEOUT, wait_for_redirect(&listener, &path, &state))
        .await
        .map_err(|_| Error::Canceled)??;
    drop(listener);

    client.exchange_code(&code, &redirect_uri, &verifier).await
}

/// Accept connections until the expected path delivers a redirect.
async fn wait_for_redirect(listener: &TcpListener, path: &str, state: &str) -> Result<String> {
    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|e| Error::Internal(format!("loopback accept failed: {}", e)))?;

        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await.unwrap_or(0);
        let raw = String::from_utf8_lossy(&buf[..n]).into_owned();

        let Some(target) = request_target(&raw) else {
            respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
            continue;
        };

        let (request_path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        if request_path != path {
            respond(&mut stream, "404 Not Found", "").await;
            continue;
        }

        let params = parse_query(query);
        if let Some(error) = lookup(&params, "error") {
            respond(&mut stream, "200 OK", FAILURE_PAGE).await;
            return if error == "access_denied" {
                Err(Error::Canceled)
            } else {
                Err(Error::AuthFailed(format!("authorization error: {}", error)))
            };
        }

        match lookup(&params, "state") {
            Some(got) if got == state => {}
            _ => {
                respond(&mut stream, "200 OK", FAILURE_PAGE).await;
                return Err(Error::StateMismatch);
            }
        }

        let Some(code) = lookup(&params, "code") else {
            respond(&mut stream, "200 OK", FAILURE_PAGE).await;
            return Err(Error::AuthFailed("redirect carried no code".into()));
        };

        respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
        return Ok(code.to_string());
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
}

/// The request target of an HTTP/1.x request line.
fn request_target(raw: &str) -> Option<&str> {
    let first_line = raw.lines().next()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?;
    if method != "GET" {
        return None;
    }
    parts.next()
}

/// Decode `a=b&c=d` query parameters.
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = urlencoding::decode(key).ok()?.into_owned();
            let value = urlencoding::decode(value).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

fn lookup<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Percent-encode parameters onto a base URL.
fn build_url(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = String::from(base);
    for (i, (key, value)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(key);
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
    url
}
