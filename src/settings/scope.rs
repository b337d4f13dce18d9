//! settings::scope
//!
//! URL-scoped configuration-name matching.
//!
//! # Matching rules
//!
//! A configuration name has the shape `credential[.<scope>].<property>`.
//! The scope is either a full URL (`<protocol>://<host>[:port][/path]`) or
//! a bare host, possibly a parent domain. Host labels match suffix-style:
//! a configured `visualstudio.com` matches `microsoft.visualstudio.com`.
//! Path matching is exact-prefix on canonicalized paths, on segment
//! boundaries. The most specific match wins; ties favor the entry set
//! later.

use crate::uri::RemoteUri;

/// Split a `credential[.<scope>].<property>` name.
///
/// Returns `(scope, property)`; the scope is `None` for unscoped names.
/// Returns `None` when the name is not in the `credential` section.
pub fn split_name(name: &str) -> Option<(Option<&str>, &str)> {
    let rest = strip_section(name)?;
    match rest.rsplit_once('.') {
        Some((scope, property)) if !scope.is_empty() && !property.is_empty() => {
            Some((Some(scope), property))
        }
        Some(_) => None,
        None if !rest.is_empty() => Some((None, rest)),
        None => None,
    }
}

fn strip_section(name: &str) -> Option<&str> {
    let (section, rest) = name.split_once('.')?;
    if section.eq_ignore_ascii_case("credential") {
        Some(rest)
    } else {
        None
    }
}

/// Score how specifically `scope` matches `url`.
///
/// Returns `None` for a non-match. Higher scores are more specific: each
/// matched path segment outweighs any number of host labels, and each
/// matched host label outweighs an explicit protocol.
pub fn scope_score(scope: &str, url: &RemoteUri) -> Option<u32> {
    let (protocol, host_port, path) = match scope.split_once("://") {
        Some((proto, rest)) => {
            let (hp, path) = match rest.split_once('/') {
                Some((hp, path)) => (hp, Some(path.trim_matches('/'))),
                None => (rest, None),
            };
            (Some(proto), hp, path)
        }
        None => (None, scope, None),
    };

    if let Some(protocol) = protocol {
        if !protocol.eq_ignore_ascii_case(&url.scheme) {
            return None;
        }
    }

    let (host, port) = match host_port.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
            (h, p.parse::<u16>().ok())
        }
        _ => (host_port, None),
    };
    if let Some(port) = port {
        if url.port != Some(port) {
            return None;
        }
    }

    let matched_labels = host_suffix_labels(host, &url.host)?;

    let matched_segments = match path {
        Some(path) if !path.is_empty() => path_prefix_segments(path, &url.path)?,
        _ => 0,
    };

    let protocol_bonus = u32::from(protocol.is_some());
    Some(matched_segments * 1_000 + matched_labels * 10 + protocol_bonus)
}

/// Number of labels `config_host` matches at the tail of `url_host`, or
/// `None` when it is not a label-aligned suffix.
fn host_suffix_labels(config_host: &str, url_host: &str) -> Option<u32> {
    let config_host = config_host.to_ascii_lowercase();
    let config_labels: Vec<&str> = config_host.split('.').collect();
    let url_labels: Vec<&str> = url_host.split('.').collect();
    if config_labels.is_empty() || config_labels.len() > url_labels.len() {
        return None;
    }
    let offset = url_labels.len() - config_labels.len();
    if url_labels[offset..] == config_labels[..] {
        Some(config_labels.len() as u32)
    } else {
        None
    }
}

/// Number of segments `config_path` matches as a prefix of `url_path`, or
/// `None` when it is not a segment-aligned prefix.
fn path_prefix_segments(config_path: &str, url_path: &str) -> Option<u32> {
    let config_segments: Vec<&str> = config_path.split('/').filter(|s| !s.is_empty()).collect();
    let url_segments: Vec<&str> = url_path.split('/').filter(|s| !s.is_empty()).collect();
    if config_segments.len() > url_segments.len() {
        return None;
    }
    if url_segments[..config_segments.len()] == config_segments[..] {
        Some(config_segments.len() as u32)
    } else {
        None
    }
}
