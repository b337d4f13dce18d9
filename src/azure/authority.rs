//! azure::authority
//!
//! OAuth authority discovery from Azure DevOps response headers.
//!
//! An unauthenticated probe against the organization URL answers 401 with
//! headers that identify the organization's Azure AD tenant:
//!
//! - `WWW-Authenticate: Bearer authorization_uri=<url>` names the authority
//!   directly. When several `Bearer` challenges are present, the first
//!   parameter named `authorization_uri` wins.
//! - Failing that, `X-VSS-ResourceTenant` carries tenant GUIDs. The first
//!   non-empty GUID yields `<base>/<guid>`; a single empty GUID means a
//!   Microsoft-account organization (`organizations` authority); anything
//!   else falls back to the `common` authority.

/// Base of every Azure AD authority URL.
pub const AUTHORITY_BASE: &str = "https://login.microsoftonline.com";

/// The all-zero GUID Azure uses for Microsoft-account organizations.
const EMPTY_TENANT_GUID: &str = "00000000-0000-0000-0000-000000000000";

/// Extract the first `authorization_uri` parameter from a set of
/// `WWW-Authenticate` header values.
pub fn parse_authorization_uri(challenges: &[&str]) -> Option<String> {
    for challenge in challenges {
        let trimmed = challenge.trim();
        let Some(params) = strip_bearer(trimmed) else {
            continue;
        };
        for param in params.split(',') {
            let param = param.trim();
            if let Some((name, value)) = param.split_once('=') {
                if name.trim().eq_ignore_ascii_case("authorization_uri") {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }
    None
}

fn strip_bearer(challenge: &str) -> Option<&str> {
    let rest = match challenge.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => challenge.get(6..)?,
        _ => return None,
    };
    // Require a parameter list (or nothing) after the scheme word.
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(rest.trim_start())
}

/// Derive an authority from `X-VSS-ResourceTenant` header values.
pub fn authority_from_tenants(tenants: &[&str]) -> Option<String> {
    let values: Vec<&str> = tenants.iter().map(|t| t.trim()).collect();
    if let Some(guid) = values
        .iter()
        .find(|v| !v.is_empty() && !v.eq_ignore_ascii_case(EMPTY_TENANT_GUID))
    {
        return Some(format!("{}/{}", AUTHORITY_BASE, guid));
    }
    if values.len() == 1 && values[0].eq_ignore_ascii_case(EMPTY_TENANT_GUID) {
        return Some(format!("{}/organizations", AUTHORITY_BASE));
    }
    None
}

/// Resolve the authority for an organization from probe headers.
///
/// Never fails: the `common` authority is the terminal fallback.
pub fn resolve_authority(www_authenticate: &[&str], resource_tenants: &[&str]) -> String {
    if let Some(authority) = parse_authorization_uri(www_authenticate) {
        return authority;
    }
    if let Some(authority) = authority_from_tenants(resource_tenants) {
        return authority;
    }
    format!("{}/common", AUTHORITY_BASE)
}
