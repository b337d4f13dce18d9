//! settings::env
//!
//! Registry of environment variables backing `credential.*` settings.
//!
//! Each variable maps onto one configuration property and takes precedence
//! over any Git configuration value for that property. Deprecated aliases
//! are listed after their replacement so the replacement wins when both are
//! set.

/// Environment variable names for a property, in precedence order.
pub fn env_names(property: &str) -> &'static [&'static str] {
    match property {
        "interactive" => &["GCM_INTERACTIVE"],
        // GCM_AUTHORITY is a deprecated alias that forces a provider id.
        "provider" => &["GCM_PROVIDER", "GCM_AUTHORITY"],
        "allowWindowsAuth" => &["GCM_ALLOW_WINDOWSAUTH"],
        // Deprecated; kept for compatibility with older setups.
        "httpProxy" => &["GCM_HTTP_PROXY"],
        "gitHubAuthModes" => &["GCM_GITHUB_AUTHMODES"],
        "namespace" => &["GCM_NAMESPACE"],
        "credentialStore" => &["GCM_CREDENTIAL_STORE"],
        "plaintextStorePath" => &["GCM_PLAINTEXT_STORE_PATH"],
        "msauthFlow" => &["GCM_MSAUTH_FLOW"],
        "trace" => &["GCM_TRACE"],
        "traceSecrets" => &["GCM_TRACE_SECRETS"],
        _ => &[],
    }
}
