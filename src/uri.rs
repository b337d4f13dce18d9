//! uri
//!
//! Minimal remote-URL parsing and canonicalization.
//!
//! # Design
//!
//! The helper only ever sees `http`/`https` remotes assembled from the
//! attributes Git hands us, so a full URL library is unnecessary. This
//! module parses exactly the shape we emit and consume:
//!
//! ```text
//! <scheme>://<host>[:port][/path][?query][#fragment]
//! ```
//!
//! Canonicalization lowercases the scheme and host, drops query and
//! fragment, and trims trailing slashes from the path. Paths are kept
//! verbatim otherwise (Azure organization names are case-sensitive on
//! display but matched case-insensitively by the service).

use std::fmt;

/// A parsed `http`/`https` remote URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RemoteUri {
    /// Lowercased scheme (`http` or `https`).
    pub scheme: String,

    /// Lowercased host without the port.
    pub host: String,

    /// Explicit port, if one was given.
    pub port: Option<u16>,

    /// Path without leading or trailing slashes. Empty when absent.
    pub path: String,
}

impl RemoteUri {
    /// Parse a remote URL.
    ///
    /// Returns `None` for anything that is not a well-formed
    /// `http`/`https` URL.
    pub fn parse(input: &str) -> Option<Self> {
        let (scheme, rest) = input.split_once("://")?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return None;
        }

        // Strip fragment, then query.
        let rest = rest.split('#').next().unwrap_or(rest);
        let rest = rest.split('?').next().unwrap_or(rest);

        let (authority, path) = match rest.split_once('/') {
            Some((a, p)) => (a, p),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return None;
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port: u16 = p.parse().ok()?;
                (h, Some(port))
            }
            None => (authority, None),
        };
        if host.is_empty() {
            return None;
        }

        Some(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
            path: path.trim_matches('/').to_string(),
        })
    }

    /// Build a remote URL from the pieces Git presents in a request.
    pub fn from_parts(protocol: &str, host: &str, path: Option<&str>) -> Option<Self> {
        let mut url = format!("{}://{}", protocol, host);
        if let Some(p) = path {
            if !p.is_empty() {
                url.push('/');
                url.push_str(p.trim_start_matches('/'));
            }
        }
        Self::parse(&url)
    }

    /// The host including the explicit port, if any.
    pub fn host_with_port(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// Canonical form used as a storage key.
    ///
    /// With `include_path = false` the path is dropped entirely, which is
    /// the default scoping for stored credentials.
    pub fn canonical(&self, include_path: bool) -> String {
        let mut out = format!("{}://{}", self.scheme, self.host_with_port());
        if include_path && !self.path.is_empty() {
            out.push('/');
            out.push_str(&self.path);
        }
        out
    }

    /// First path segment, if any.
    pub fn first_path_segment(&self) -> Option<&str> {
        self.path.split('/').find(|s| !s.is_empty())
    }

    /// Host labels, most-specific first (`www.example.com` → `["www",
    /// "example", "com"]`).
    pub fn host_labels(&self) -> Vec<&str> {
        self.host.split('.').collect()
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let uri = RemoteUri::parse("https://github.com").expect("parse");
        assert_eq!(uri.scheme, "https");
        assert_eq!(uri.host, "github.com");
        assert_eq!(uri.port, None);
        assert_eq!(uri.path, "");
    }

    #[test]
    fn parse_with_port_and_path() {
        let uri = RemoteUri::parse("http://example.com:8080/a/b/").expect("parse");
        assert_eq!(uri.host, "example.com");
        assert_eq!(uri.port, Some(8080));
        assert_eq!(uri.path, "a/b");
        assert_eq!(uri.host_with_port(), "example.com:8080");
    }

    #[test]
    fn parse_lowercases_host() {
        let uri = RemoteUri::parse("https://GitHub.COM/Owner/Repo").expect("parse");
        assert_eq!(uri.host, "github.com");
        assert_eq!(uri.path, "Owner/Repo");
    }

    #[test]
    fn parse_strips_query_and_fragment() {
        let uri = RemoteUri::parse("https://host/path?x=1#frag").expect("parse");
        assert_eq!(uri.canonical(true), "https://host/path");
    }

    #[test]
    fn parse_rejects_other_schemes() {
        assert!(RemoteUri::parse("ssh://git@github.com/o/r").is_none());
        assert!(RemoteUri::parse("git@github.com:o/r.git").is_none());
        assert!(RemoteUri::parse("https://").is_none());
    }

    #[test]
    fn parse_rejects_bad_port() {
        assert!(RemoteUri::parse("https://host:notaport/x").is_none());
    }

    #[test]
    fn from_parts_joins_path() {
        let uri = RemoteUri::from_parts("https", "dev.azure.com", Some("contoso/_git/widgets"))
            .expect("parse");
        assert_eq!(uri.canonical(true), "https://dev.azure.com/contoso/_git/widgets");
        assert_eq!(uri.canonical(false), "https://dev.azure.com");
    }

    #[test]
    fn first_path_segment_skips_empty() {
        let uri = RemoteUri::parse("https://dev.azure.com//contoso/x").expect("parse");
        assert_eq!(uri.first_path_segment(), Some("contoso"));
    }

    #[test]
    fn host_labels_split() {
        let uri = RemoteUri::parse("https://microsoft.visualstudio.com").expect("parse");
        assert_eq!(uri.host_labels(), vec!["microsoft", "visualstudio", "com"]);
    }

    #[test]
    fn display_is_canonical_with_path() {
        let uri = RemoteUri::parse("https://Example.com/a/?q=1").expect("parse");
        assert_eq!(uri.to_string(), "https://example.com/a");
    }
}
