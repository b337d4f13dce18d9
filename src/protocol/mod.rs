//! protocol
//!
//! The Git credential-helper wire protocol.
//!
//! # Wire format
//!
//! Git speaks a line-oriented `key=value` dictionary over standard input and
//! standard output. A dictionary ends at end-of-stream or at the first empty
//! line. Lines are LF-terminated; a trailing CR before the LF is tolerated on
//! input. Each non-empty line is split on the first `=`; lines without a `=`
//! are dropped silently so that future Git attribute extensions do not break
//! older helpers.
//!
//! Keys are case-insensitive on lookup but preserved as given. Values are
//! byte-transparent except for LF, which terminates them.
//!
//! # Contract
//!
//! - [`read_request`] fails with `MalformedInput` if the stream ends in the
//!   middle of a line or contains a null byte.
//! - [`write_response`] emits `protocol`, `host`, `path` (when the request
//!   carried one), `username`, `password`, then a terminating blank line,
//!   and flushes before returning.
//! - On `store`/`erase` nothing is written to standard output at all.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::uri::RemoteUri;
use crate::vault::Credential;

/// Attribute key for repeated `WWW-Authenticate` challenges echoed by Git.
pub const WWWAUTH_KEY: &str = "wwwauth[]";

/// A parsed credential request (the "fingerprint" Git presents).
///
/// The record is immutable once parsed. Unknown keys are preserved but
/// otherwise ignored.
#[derive(Debug, Clone, Default)]
pub struct Request {
    attributes: Vec<(String, String)>,
}

impl Request {
    /// Build a request from attribute pairs. Primarily for tests and for
    /// synthesizing requests internally.
    pub fn from_attributes(attributes: Vec<(String, String)>) -> Self {
        Self { attributes }
    }

    /// Look up the first value for a key, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded for a key, in input order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The `protocol` attribute.
    pub fn protocol(&self) -> Option<&str> {
        self.get("protocol")
    }

    /// The `host` attribute (may include an explicit `:port`).
    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    /// The `path` attribute.
    pub fn path(&self) -> Option<&str> {
        self.get("path")
    }

    /// The `username` attribute.
    pub fn username(&self) -> Option<&str> {
        self.get("username")
    }

    /// The `password` attribute (present only on `store`/`erase`).
    pub fn password(&self) -> Option<&str> {
        self.get("password")
    }

    /// `WWW-Authenticate` challenges echoed by Git, in order.
    pub fn www_authenticate(&self) -> Vec<&str> {
        self.get_all(WWWAUTH_KEY)
    }

    /// Validate the attributes every subcommand requires.
    ///
    /// `protocol` must be `http` or `https` and `host` must be present.
    pub fn require_protocol_and_host(&self) -> Result<()> {
        match self.protocol() {
            Some("http") | Some("https") => {}
            Some(other) => {
                return Err(Error::MalformedInput(format!(
                    "unsupported protocol attribute '{}'",
                    other
                )))
            }
            None => {
                return Err(Error::MalformedInput(
                    "missing required attribute 'protocol'".into(),
                ))
            }
        }
        if self.host().map_or(true, str::is_empty) {
            return Err(Error::MalformedInput(
                "missing required attribute 'host'".into(),
            ));
        }
        Ok(())
    }

    /// The remote URL this request points at.
    pub fn remote_uri(&self) -> Option<RemoteUri> {
        RemoteUri::from_parts(self.protocol()?, self.host()?, self.path())
    }
}

/// Read a request dictionary from `reader`.
///
/// The dictionary ends at end-of-stream or at the first empty line.
/// Malformed (separator-less) lines are dropped silently. A line consisting
/// of a lone CR is *not* a terminator; the protocol is LF-terminated.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Request> {
    let mut attributes = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| Error::MalformedInput(format!("cannot read request: {}", e)))?;
        if n == 0 {
            // Clean end-of-stream terminates the dictionary.
            break;
        }

        if buf.contains(&0) {
            return Err(Error::MalformedInput(
                "request contains a null byte".into(),
            ));
        }

        let had_newline = buf.last() == Some(&b'\n');
        if had_newline {
            buf.pop();
        } else {
            // EOF arrived mid-line; the producer was cut off.
            return Err(Error::MalformedInput(
                "unexpected end of stream inside attribute line".into(),
            ));
        }

        // An empty line (before CR stripping) terminates the dictionary.
        if buf.is_empty() {
            break;
        }

        // Tolerate CRLF input.
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        let line = String::from_utf8(buf.clone())
            .map_err(|_| Error::MalformedInput("attribute line is not valid UTF-8".into()))?;

        match line.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                attributes.push((key.to_string(), value.to_string()));
            }
            // Forward-compatible: drop anything we cannot split.
            _ => {}
        }
    }

    Ok(Request { attributes })
}

/// Write a credential response for a `get` to `writer`.
///
/// Echoes `protocol` and `host` (and `path` when the request carried one)
/// for clarity, then the credential, then the blank-line terminator. The
/// writer is flushed before returning.
pub fn write_response<W: Write>(
    writer: &mut W,
    request: &Request,
    credential: &Credential,
) -> Result<()> {
    if let Some(protocol) = request.protocol() {
        write_attribute(writer, "protocol", protocol)?;
    }
    if let Some(host) = request.host() {
        write_attribute(writer, "host", host)?;
    }
    if let Some(path) = request.path() {
        write_attribute(writer, "path", path)?;
    }
    write_attribute(writer, "username", &credential.username)?;
    write_attribute(writer, "password", credential.secret())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn write_attribute<W: Write>(writer: &mut W, key: &str, value: &str) -> Result<()> {
    if value.contains('\n') || value.contains('\0') {
        return Err(Error::Internal(format!(
            "attribute '{}' contains a line break and cannot be sent to Git",
            key
        )));
    }
    writer.write_all(key.as_bytes())?;
    writer.write_all(b"=")?;
    writer.write_all(value.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(input: &str) -> Request {
        read_request(&mut Cursor::new(input.as_bytes())).expect("parse request")
    }

    #[test]
    fn parses_basic_dictionary() {
        let req = parse("protocol=https\nhost=github.com\n\n");
        assert_eq!(req.protocol(), Some("https"));
        assert_eq!(req.host(), Some("github.com"));
        assert_eq!(req.path(), None);
    }

    #[test]
    fn dictionary_ends_at_eof_without_blank_line() {
        let req = parse("protocol=https\nhost=example.com\n");
        assert_eq!(req.host(), Some("example.com"));
    }

    #[test]
    fn tolerates_crlf_input() {
        let req = parse("protocol=https\r\nhost=github.com\r\n\r\n");
        assert_eq!(req.protocol(), Some("https"));
        assert_eq!(req.host(), Some("github.com"));
    }

    #[test]
    fn lone_cr_line_is_not_a_terminator() {
        // The protocol is LF-terminated; "\r\n" is a one-character line
        // holding a CR, which is malformed and dropped, not a terminator.
        let req = parse("protocol=https\n\r\nhost=github.com\n\n");
        assert_eq!(req.host(), Some("github.com"));
    }

    #[test]
    fn drops_malformed_lines_silently() {
        let req = parse("protocol=https\nnot a pair\nhost=github.com\n\n");
        assert_eq!(req.protocol(), Some("https"));
        assert_eq!(req.host(), Some("github.com"));
    }

    #[test]
    fn value_may_contain_equals() {
        let req = parse("password=a=b=c\n\n");
        assert_eq!(req.password(), Some("a=b=c"));
    }

    #[test]
    fn rejects_null_bytes() {
        let err = read_request(&mut Cursor::new(b"proto\0col=https\n\n".as_slice()))
            .expect_err("should fail");
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn rejects_eof_mid_line() {
        let err =
            read_request(&mut Cursor::new(b"protocol=https\nhost=git".as_slice()))
                .expect_err("should fail");
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn keys_are_case_insensitive_on_lookup() {
        let req = parse("Protocol=https\nHOST=github.com\n\n");
        assert_eq!(req.protocol(), Some("https"));
        assert_eq!(req.host(), Some("github.com"));
    }

    #[test]
    fn wwwauth_values_are_collected_in_order() {
        let req = parse(
            "protocol=https\nhost=example.com\nwwwauth[]=Basic realm=\"x\"\nwwwauth[]=Negotiate\n\n",
        );
        assert_eq!(
            req.www_authenticate(),
            vec!["Basic realm=\"x\"", "Negotiate"]
        );
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let req = parse("protocol=https\nhost=h\ncapability[]=authtype\n\n");
        assert_eq!(req.get("capability[]"), Some("authtype"));
    }

    #[test]
    fn require_protocol_and_host_accepts_http_and_https() {
        assert!(parse("protocol=https\nhost=h\n\n")
            .require_protocol_and_host()
            .is_ok());
        assert!(parse("protocol=http\nhost=h\n\n")
            .require_protocol_and_host()
            .is_ok());
    }

    #[test]
    fn require_protocol_and_host_rejects_missing_fields() {
        assert!(parse("host=h\n\n").require_protocol_and_host().is_err());
        assert!(parse("protocol=https\n\n")
            .require_protocol_and_host()
            .is_err());
        assert!(parse("protocol=ftp\nhost=h\n\n")
            .require_protocol_and_host()
            .is_err());
    }

    #[test]
    fn remote_uri_assembles_from_attributes() {
        let req = parse("protocol=https\nhost=dev.azure.com\npath=contoso/_git/widgets\n\n");
        let uri = req.remote_uri().expect("uri");
        assert_eq!(uri.canonical(true), "https://dev.azure.com/contoso/_git/widgets");
    }

    #[test]
    fn response_round_trips_through_parser() {
        let req = parse("protocol=https\nhost=github.com\n\n");
        let credential = Credential::new("alice", "s3cret");

        let mut out = Vec::new();
        write_response(&mut out, &req, &credential).expect("write");

        assert_eq!(
            String::from_utf8(out.clone()).unwrap(),
            "protocol=https\nhost=github.com\nusername=alice\npassword=s3cret\n\n"
        );

        let reparsed = read_request(&mut Cursor::new(&out)).expect("reparse");
        assert_eq!(reparsed.username(), Some("alice"));
        assert_eq!(reparsed.password(), Some("s3cret"));
    }

    #[test]
    fn response_echoes_path_only_when_present() {
        let req = parse("protocol=https\nhost=h\npath=a/b\n\n");
        let mut out = Vec::new();
        write_response(&mut out, &req, &Credential::new("u", "p")).expect("write");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("path=a/b\n"));
    }

    #[test]
    fn response_rejects_newlines_in_values() {
        let req = parse("protocol=https\nhost=h\n\n");
        let mut out = Vec::new();
        let err = write_response(&mut out, &req, &Credential::new("u", "p\nq"))
            .expect_err("should fail");
        assert!(matches!(err, Error::Internal(_)));
    }
}
