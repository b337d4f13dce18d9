//! oauth::device
//!
//! OAuth 2.0 device-code flow.
//!
//! # Flow
//!
//! 1. POST to the device-authorization endpoint for a `device_code`,
//!    `user_code`, `verification_uri`, polling `interval`, and
//!    `expires_in`.
//! 2. Show the user code and verification URL through the prompter (plain
//!    terminal output when no richer UI exists).
//! 3. Poll the token endpoint at `interval` seconds:
//!    `authorization_pending` continues, `slow_down` stretches the
//!    interval by five seconds, `expired_token` and `access_denied` are
//!    terminal, success returns the tokens.
//!
//! Polling stops at the device code's own expiry deadline.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::{sleep, Instant};

use super::{OAuthClient, OAuthErrorResponse, TokenResult};
use crate::error::{Error, Result};
use crate::ui::Prompter;

/// How much `slow_down` stretches the polling interval.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Response from the device-authorization endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    /// Code the client polls with.
    pub device_code: String,

    /// Code the user types at the verification URL.
    pub user_code: String,

    /// URL the user visits to approve the sign-in.
    pub verification_uri: String,

    /// Seconds until the device code expires.
    pub expires_in: u64,

    /// Minimum polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// Run the device-code flow and return the token result.
pub async fn authorize(
    client: &OAuthClient,
    scopes: &[&str],
    prompter: &dyn Prompter,
) -> Result<TokenResult> {
    let authorization = request_device_code(client, scopes).await?;

    prompter.show_device_code(&authorization.user_code, &authorization.verification_uri)?;

    poll_for_token(client, &authorization).await
}

/// Request a device code to begin the flow.
pub async fn request_device_code(
    client: &OAuthClient,
    scopes: &[&str],
) -> Result<DeviceAuthorization> {
    let scope = scopes.join(" ");
    let params = [("client_id", client.client_id()), ("scope", scope.as_str())];
    let body = client
        .post_form(&client.endpoints().device_authorization, &params)
        .await?;

    if let Ok(authorization) = serde_json::from_str::<DeviceAuthorization>(&body) {
        return Ok(authorization);
    }
    if let Ok(err) = serde_json::from_str::<OAuthErrorResponse>(&body) {
        return Err(Error::AuthFailed(format!(
            "{}: {}",
            err.error,
            err.error_description.unwrap_or_default()
        )));
    }
    Err(Error::AuthFailed(
        "unrecognized device-authorization response".into(),
    ))
}

/// Poll the token endpoint until the user approves, denies, or the code
/// expires.
pub async fn poll_for_token(
    client: &OAuthClient,
    authorization: &DeviceAuthorization,
) -> Result<TokenResult> {
    let deadline = Instant::now() + Duration::from_secs(authorization.expires_in);
    let mut interval = Duration::from_secs(authorization.interval.max(1));

    loop {
        if Instant::now() >= deadline {
            return Err(Error::Canceled);
        }

        sleep(interval).await;

        match poll_once(client, &authorization.device_code).await? {
            PollOutcome::Success(token) => return Ok(token),
            PollOutcome::Pending => {}
            PollOutcome::SlowDown => interval += SLOW_DOWN_STEP,
            PollOutcome::Expired => {
                return Err(Error::AuthFailed("device code expired".into()))
            }
            PollOutcome::Denied => return Err(Error::Canceled),
        }
    }
}

#[derive(Debug)]
enum PollOutcome {
    Success(TokenResult),
    Pending,
    SlowDown,
    Expired,
    Denied,
}

async fn poll_once(client: &OAuthClient, device_code: &str) -> Result<PollOutcome> {
    let params = [
        ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
        ("client_id", client.client_id()),
        ("device_code", device_code),
    ];
    let body = client.post_form(&client.endpoints().token, &params).await?;
    Ok(classify_poll_body(&body)?)
}

/// Classify one token-endpoint answer during polling.
fn classify_poll_body(body: &str) -> Result<PollOutcome> {
    match OAuthClient::parse_token_body(body) {
        Ok(token) => Ok(PollOutcome::Success(token)),
        Err(Error::AuthFailed(_)) => {
            let err: OAuthErrorResponse = serde_json::from_str(body).map_err(|_| {
                Error::AuthFailed("unrecognized polling response".into())
            })?;
            match err.error.as_str() {
                "authorization_pending" => Ok(PollOutcome::Pending),
                "slow_down" => Ok(PollOutcome::SlowDown),
                "expired_token" => Ok(PollOutcome::Expired),
                "access_denied" => Ok(PollOutcome::Denied),
                other => Err(Error::AuthFailed(format!(
                    "{}: {}",
                    other,
                    err.error_description.unwrap_or_default()
                ))),
            }
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_authorization_deserializes() {
        let json = r#"{
            "device_code": "dev123",
            "user_code": "ABCD-1234",
            "verification_uri": "https://github.com/login/device",
            "expires_in": 900,
            "interval": 5
        }"#;
        let auth: DeviceAuthorization = serde_json::from_str(json).expect("parse");
        assert_eq!(auth.device_code, "dev123");
        assert_eq!(auth.user_code, "ABCD-1234");
        assert_eq!(auth.verification_uri, "https://github.com/login/device");
        assert_eq!(auth.expires_in, 900);
        assert_eq!(auth.interval, 5);
    }

    #[test]
    fn missing_interval_defaults_to_five() {
        let json = r#"{
            "device_code": "d",
            "user_code": "u",
            "verification_uri": "https://v",
            "expires_in": 900
        }"#;
        let auth: DeviceAuthorization = serde_json::from_str(json).expect("parse");
        assert_eq!(auth.interval, 5);
    }

    #[test]
    fn pending_keeps_polling() {
        let body = r#"{"error":"authorization_pending"}"#;
        assert!(matches!(
            classify_poll_body(body).expect("classify"),
            PollOutcome::Pending
        ));
    }

    #[test]
    fn slow_down_stretches_interval() {
        let body = r#"{"error":"slow_down"}"#;
        assert!(matches!(
            classify_poll_body(body).expect("classify"),
            PollOutcome::SlowDown
        ));
    }

    #[test]
    fn expired_token_is_terminal() {
        let body = r#"{"error":"expired_token"}"#;
        assert!(matches!(
            classify_poll_body(body).expect("classify"),
            PollOutcome::Expired
        ));
    }

    #[test]
    fn access_denied_is_terminal() {
        let body = r#"{"error":"access_denied"}"#;
        assert!(matches!(
            classify_poll_body(body).expect("classify"),
            PollOutcome::Denied
        ));
    }

    #[test]
    fn unknown_error_fails() {
        let body = r#"{"error":"server_error","error_description":"boom"}"#;
        let err = classify_poll_body(body).expect_err("should fail");
        assert!(matches!(err, Error::AuthFailed(_)));
    }

    #[test]
    fn success_body_yields_token() {
        let body = r#"{"access_token":"tok","expires_in":900}"#;
        match classify_poll_body(body).expect("classify") {
            PollOutcome::Success(token) => assert_eq!(token.access_token, "tok"),
            _ => panic!("expected success"),
        }
    }
}
