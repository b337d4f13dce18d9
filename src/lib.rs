//! Quay - a universal Git credential helper
//!
//! Quay is the process Git invokes to obtain, store, and erase credentials
//! for remote repositories. Git speaks a line-oriented key/value protocol
//! over the helper's standard input and output; Quay answers with a valid
//! credential or a clean decline, and persists credentials so later
//! invocations need no user interaction.
//!
//! # Architecture
//!
//! The codebase is layered, leaves first:
//!
//! - [`settings`] - scoped settings resolver (env > url-scoped Git config)
//! - [`ini`] - transactional INI store (write-temp, fsync, rename)
//! - [`secrets`] / [`vault`] - secret-store backends and the credential
//!   facade over them
//! - [`oauth`] - authorization-code + PKCE, device-code, and refresh flows
//! - [`azure`] - organization parsing, authority discovery, and the
//!   sign-in cache
//! - [`providers`] - the closed provider set (Azure Repos, GitHub,
//!   generic) and the ordered registry
//! - [`protocol`] - the Git credential wire dictionary
//! - [`cli`] - argument parsing, dispatch, and exit-code mapping
//!
//! # Correctness invariants
//!
//! 1. The sign-in cache on disk is always the last committed state; a
//!    crash can never leave a partially-written file.
//! 2. An explicit remote-level sign-out suppresses the organization-level
//!    user until an explicit sign-in at the same scope.
//! 3. Secrets never appear in traces, errors, or debug output unless
//!    secret tracing is explicitly enabled.

pub mod azure;
pub mod cli;
pub mod error;
pub mod git;
pub mod ini;
pub mod oauth;
pub mod protocol;
pub mod providers;
pub mod secrets;
pub mod settings;
pub mod ui;
pub mod uri;
pub mod vault;

pub use error::{Error, Result};

/// User-Agent presented on every HTTP request.
pub const USER_AGENT: &str = concat!("git-credential-quay/", env!("CARGO_PKG_VERSION"));
