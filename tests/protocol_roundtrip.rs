//! Wire-level tests for the Git credential protocol adapter.
//!
//! These exercise the exact byte sequences Git produces and expects,
//! including the CRLF tolerance and terminator edge cases.

use std::io::Cursor;

use quay::protocol::{read_request, write_response};
use quay::vault::Credential;

fn parse(bytes: &[u8]) -> quay::protocol::Request {
    read_request(&mut Cursor::new(bytes)).expect("parse request")
}

#[test]
fn github_get_fingerprint_parses() {
    let request = parse(b"protocol=https\nhost=github.com\n\n");
    assert_eq!(request.protocol(), Some("https"));
    assert_eq!(request.host(), Some("github.com"));
    assert!(request.require_protocol_and_host().is_ok());
}

#[test]
fn response_matches_gits_expectations_byte_for_byte() {
    let request = parse(b"protocol=https\nhost=github.com\n\n");
    let credential = Credential::new("alice", "s3cret");

    let mut out = Vec::new();
    write_response(&mut out, &request, &credential).expect("write response");

    assert_eq!(
        out,
        b"protocol=https\nhost=github.com\nusername=alice\npassword=s3cret\n\n"
    );
}

#[test]
fn response_round_trips_through_the_parser() {
    let request = parse(b"protocol=https\nhost=example.com\npath=team/repo\n\n");
    let credential = Credential::new("bob", "pa=ss=word");

    let mut out = Vec::new();
    write_response(&mut out, &request, &credential).expect("write response");

    let reparsed = parse(&out);
    assert_eq!(reparsed.protocol(), Some("https"));
    assert_eq!(reparsed.host(), Some("example.com"));
    assert_eq!(reparsed.path(), Some("team/repo"));
    assert_eq!(reparsed.username(), Some("bob"));
    assert_eq!(reparsed.password(), Some("pa=ss=word"));
}

#[test]
fn store_fingerprint_carries_the_password() {
    let request = parse(
        b"protocol=https\nhost=github.com\nusername=alice\npassword=s3cret\n\n",
    );
    assert_eq!(request.username(), Some("alice"));
    assert_eq!(request.password(), Some("s3cret"));
}

#[test]
fn crlf_input_is_accepted() {
    let request = parse(b"protocol=https\r\nhost=github.com\r\n\r\n");
    assert_eq!(request.host(), Some("github.com"));
}

#[test]
fn lone_cr_line_does_not_terminate_the_dictionary() {
    // The protocol is LF-terminated; a line holding only CR is malformed
    // (and dropped), not a terminator.
    let request = parse(b"protocol=https\n\r\nhost=github.com\n\n");
    assert_eq!(request.host(), Some("github.com"));
}

#[test]
fn null_bytes_are_fatal() {
    let err = read_request(&mut Cursor::new(b"host=git\0hub.com\n\n".as_slice()))
        .expect_err("must fail");
    assert!(matches!(err, quay::Error::MalformedInput(_)));
}

#[test]
fn truncated_stream_is_fatal() {
    let err = read_request(&mut Cursor::new(b"protocol=https\nhos".as_slice()))
        .expect_err("must fail");
    assert!(matches!(err, quay::Error::MalformedInput(_)));
}

#[test]
fn wwwauth_attributes_accumulate() {
    let request = parse(
        b"protocol=https\nhost=corp.example.com\nwwwauth[]=Negotiate\nwwwauth[]=Basic realm=\"corp\"\n\n",
    );
    assert_eq!(
        request.www_authenticate(),
        vec!["Negotiate", "Basic realm=\"corp\""]
    );
}

#[test]
fn host_lookup_is_case_insensitive() {
    let request = parse(b"PROTOCOL=https\nHost=GitHub.com\n\n");
    assert_eq!(request.protocol(), Some("https"));
    // Values keep their case; only key lookup is folded.
    assert_eq!(request.host(), Some("GitHub.com"));
}
