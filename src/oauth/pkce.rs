//! oauth::pkce
//!
//! Proof Key for Code Exchange (RFC 7636) and flow entropy.
//!
//! The verifier is drawn from the RFC's unreserved character set; the
//! challenge is the base64url encoding (no padding) of its SHA-256 digest.
//! The same entropy source feeds the `state` nonce and the random loopback
//! redirect path.

use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Unreserved characters permitted in a code verifier (RFC 7636 §4.1).
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Length of generated verifiers (the RFC allows 43-128).
const VERIFIER_LEN: usize = 64;

/// Generate a PKCE code verifier.
pub fn code_verifier() -> String {
    let mut rng = rand::thread_rng();
    (0..VERIFIER_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..VERIFIER_CHARSET.len());
            VERIFIER_CHARSET[idx] as char
        })
        .collect()
}

/// Compute the S256 code challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a `state` nonce with at least 128 bits of entropy.
pub fn state_nonce() -> String {
    random_hex(32)
}

/// Generate a random lowercase-hex string of `len` characters.
pub fn random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..HEX.len());
            HEX[idx] as char
        })
        .collect()
}
