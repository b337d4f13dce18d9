//! azure::org
//!
//! Azure Repos organization derivation from remote URLs.
//!
//! An organization is encoded either in the host (`<org>.visualstudio.com`,
//! `<org>.dev.azure.com`) or as the first path segment under the shared
//! `dev.azure.com` host.

use crate::uri::RemoteUri;

/// Shared Azure DevOps host.
pub const DEV_AZURE_HOST: &str = "dev.azure.com";

/// Legacy per-organization host suffix.
pub const VISUALSTUDIO_SUFFIX: &str = ".visualstudio.com";

/// Check whether a host belongs to Azure Repos.
pub fn is_azure_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == DEV_AZURE_HOST
        || host.ends_with(&format!(".{}", DEV_AZURE_HOST))
        || host.ends_with(VISUALSTUDIO_SUFFIX)
}

/// Derive the organization name from a remote URL.
///
/// Returns `None` when the URL does not identify an organization (for
/// example `https://dev.azure.com` with no path).
pub fn organization_from(uri: &RemoteUri) -> Option<String> {
    let host = uri.host.as_str();
    if host == DEV_AZURE_HOST {
        return uri.first_path_segment().map(str::to_string);
    }
    if let Some(org) = host.strip_suffix(&format!(".{}", DEV_AZURE_HOST)) {
        if !org.is_empty() && !org.contains('.') {
            return Some(org.to_string());
        }
        return None;
    }
    if let Some(prefix) = host.strip_suffix(VISUALSTUDIO_SUFFIX) {
        // Legacy hosts may carry a service label, e.g. `org.vsrm`.
        let org = prefix.split('.').next()?;
        if !org.is_empty() {
            return Some(org.to_string());
        }
    }
    None
}

/// The base URL the organization is reachable at, used for authority
/// discovery probes.
pub fn organization_url(uri: &RemoteUri, org: &str) -> String {
    if uri.host == DEV_AZURE_HOST {
        format!("{}://{}/{}", uri.scheme, uri.host_with_port(), org)
    } else {
        format!("{}://{}", uri.scheme, uri.host_with_port())
    }
}
