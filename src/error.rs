//! error
//!
//! Crate-wide error taxonomy for the credential helper.
//!
//! # Design
//!
//! Every failure the helper can surface to Git falls into one of a small set
//! of categories. The categories drive two observable behaviors:
//!
//! - the single-line `fatal: <message>` printed on stderr, and
//! - the process exit code (`0` success or benign decline, `1` failure,
//!   `130` cancellation).
//!
//! Module-scoped errors ([`crate::secrets::SecretError`],
//! [`crate::ui::PromptError`], [`crate::git::GitError`],
//! [`crate::ini::IniError`]) convert into this taxonomy at the boundary.
//!
//! # Security
//!
//! Error messages never contain secret material. Anything that might carry a
//! token is reduced to a category and a short context string.

use thiserror::Error;

/// Process exit code for a canceled interactive flow.
pub const EXIT_CANCELED: i32 = 130;

/// Process exit code for a generic fatal failure.
pub const EXIT_FAILURE: i32 = 1;

/// Errors surfaced by the credential helper.
#[derive(Debug, Error)]
pub enum Error {
    /// The request dictionary on standard input could not be parsed.
    #[error("malformed credential request: {0}")]
    MalformedInput(String),

    /// The request uses a protocol the selected provider refuses to serve.
    #[error("{0}")]
    UnsupportedProtocol(String),

    /// No provider matches the request, or a forced provider id is unknown.
    #[error("{0}")]
    NoProvider(String),

    /// A prompt is required but interaction has been disabled.
    #[error("cannot prompt because user interactivity has been disabled")]
    InteractionDisabled,

    /// The upstream authentication endpoint rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The `state` returned by the authorization server did not match ours.
    #[error("authorization response state does not match the request state")]
    StateMismatch,

    /// The user (or a flow deadline) canceled the interactive flow.
    #[error("operation was canceled")]
    Canceled,

    /// A network-level failure that may succeed on retry of the Git operation.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A persistent store is unreadable.
    #[error("credential cache is corrupt: {0}")]
    StoreCorrupt(String),

    /// Any unexpected condition.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Map this error to the helper's process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Canceled => EXIT_CANCELED,
            _ => EXIT_FAILURE,
        }
    }

    /// Check whether retrying the Git operation might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }

    /// Check whether this error must never be swallowed by a provider.
    ///
    /// `Canceled` and `InteractionDisabled` always propagate to the adapter.
    pub fn must_propagate(&self) -> bool {
        matches!(self, Error::Canceled | Error::InteractionDisabled)
    }
}

impl From<crate::secrets::SecretError> for Error {
    fn from(err: crate::secrets::SecretError) -> Self {
        Error::Internal(format!("secret store: {}", err))
    }
}

impl From<crate::ui::PromptError> for Error {
    fn from(err: crate::ui::PromptError) -> Self {
        match err {
            crate::ui::PromptError::Cancelled => Error::Canceled,
            crate::ui::PromptError::NotInteractive => Error::InteractionDisabled,
            crate::ui::PromptError::IoError(msg) => Error::Internal(format!("prompt: {}", msg)),
        }
    }
}

impl From<crate::ini::IniError> for Error {
    fn from(err: crate::ini::IniError) -> Self {
        match err {
            crate::ini::IniError::Corrupt { .. } => Error::StoreCorrupt(err.to_string()),
            crate::ini::IniError::Io(msg) => Error::Internal(format!("cache I/O: {}", msg)),
        }
    }
}

impl From<crate::git::GitError> for Error {
    fn from(err: crate::git::GitError) -> Self {
        Error::Internal(format!("git: {}", err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Connection-level failures and deadlines are retryable by Git.
        Error::Transient(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("JSON: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(format!("I/O error: {}", err))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
