//! git
//!
//! Single doorway to Git configuration.
//!
//! # Architecture
//!
//! All Git interaction flows through this module; no other module imports
//! `git2`. The helper needs two things from Git:
//!
//! - an ordered snapshot of configuration entries for the scoped settings
//!   resolver (later entries are more specific, matching `git config
//!   --list` semantics), and
//! - mutation of the `credential.helper` multivar for
//!   `configure`/`unconfigure`.
//!
//! Reads pick up the repository-local configuration when the helper is
//! invoked inside a work tree, falling back to the global/system stack
//! otherwise. That matches what Git itself consults for the calling
//! repository.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from Git configuration access.
#[derive(Debug, Error)]
pub enum GitError {
    /// The configuration stack could not be opened.
    #[error("cannot open git configuration: {0}")]
    ConfigUnavailable(String),

    /// A configuration write failed.
    #[error("cannot update git configuration: {0}")]
    WriteFailed(String),
}

/// An ordered snapshot of Git configuration entries.
///
/// Entries appear in the order Git reports them (system, then global, then
/// local), so a later entry always wins a specificity tie.
#[derive(Debug, Clone, Default)]
pub struct GitConfig {
    entries: Vec<(String, String)>,
}

impl GitConfig {
    /// Snapshot the configuration Git would use for `cwd`.
    pub fn snapshot(cwd: &Path) -> Result<Self, GitError> {
        let config = match git2::Repository::discover(cwd) {
            Ok(repo) => repo
                .config()
                .map_err(|e| GitError::ConfigUnavailable(e.to_string()))?,
            Err(_) => git2::Config::open_default()
                .map_err(|e| GitError::ConfigUnavailable(e.to_string()))?,
        };

        let mut entries = Vec::new();
        let mut iter = config
            .entries(None)
            .map_err(|e| GitError::ConfigUnavailable(e.to_string()))?;
        while let Some(entry) = iter.next() {
            let entry = entry.map_err(|e| GitError::ConfigUnavailable(e.to_string()))?;
            if let (Some(name), Some(value)) = (entry.name(), entry.value()) {
                entries.push((name.to_string(), value.to_string()));
            }
        }
        Ok(Self { entries })
    }

    /// Build a snapshot from literal entries (tests and tooling).
    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Iterate entries in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Register `helper_path` as a credential helper in the global or system
/// configuration file.
pub fn configure_helper(helper_path: &str, system: bool) -> Result<(), GitError> {
    configure_helper_at(&scope_config_path(system)?, helper_path)
}

/// Remove `helper_path` from the configured credential helpers.
pub fn unconfigure_helper(helper_path: &str, system: bool) -> Result<(), GitError> {
    unconfigure_helper_at(&scope_config_path(system)?, helper_path)
}

/// Register the helper in the configuration file at `path`.
///
/// Stale entries naming the same executable are dropped first. With other
/// helpers present the path is appended via `set_multivar` (the anchored
/// pattern matches nothing after the removal); with no `credential.helper`
/// at all a plain set creates the key, which also creates the file itself
/// on a fresh machine.
fn configure_helper_at(path: &Path, helper_path: &str) -> Result<(), GitError> {
    let mut config = open_config_file(path)?;
    let pattern = format!("^{}$", regex_escape(helper_path));

    match config.remove_multivar("credential.helper", &pattern) {
        Ok(()) => {}
        Err(e) if e.code() == git2::ErrorCode::NotFound => {}
        Err(e) => return Err(GitError::WriteFailed(e.to_string())),
    }

    let result = if has_helper_entries(&config)? {
        config.set_multivar("credential.helper", &pattern, helper_path)
    } else {
        config.set_str("credential.helper", helper_path)
    };
    result.map_err(|e| GitError::WriteFailed(e.to_string()))?;
    Ok(())
}

/// Whether any `credential.helper` values exist in `config`.
fn has_helper_entries(config: &git2::Config) -> Result<bool, GitError> {
    let mut iter = match config.multivar("credential.helper", None) {
        Ok(iter) => iter,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(false),
        Err(e) => return Err(GitError::ConfigUnavailable(e.to_string())),
    };
    match iter.next() {
        Some(Ok(_)) => Ok(true),
        Some(Err(e)) if e.code() == git2::ErrorCode::NotFound => Ok(false),
        Some(Err(e)) => Err(GitError::ConfigUnavailable(e.to_string())),
        None => Ok(false),
    }
}

/// Remove exactly the entries naming this executable from the
/// configuration file at `path`, leaving everything else as it was.
fn unconfigure_helper_at(path: &Path, helper_path: &str) -> Result<(), GitError> {
    let mut config = open_config_file(path)?;
    let pattern = format!("^{}$", regex_escape(helper_path));
    match config.remove_multivar("credential.helper", &pattern) {
        Ok(()) => Ok(()),
        // Removing an absent entry leaves the prior state intact.
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
        Err(e) => Err(GitError::WriteFailed(e.to_string())),
    }
}

fn open_config_file(path: &Path) -> Result<git2::Config, GitError> {
    git2::Config::open(path).map_err(|e| GitError::ConfigUnavailable(e.to_string()))
}

/// Locate the configuration file for a scope.
///
/// libgit2's `find_global`/`find_system` answer `NotFound` when the file
/// does not exist yet rather than naming the path it would use, so a
/// fresh machine needs the conventional default path; `Config::open`
/// creates the file on first write.
fn scope_config_path(system: bool) -> Result<PathBuf, GitError> {
    let found = if system {
        git2::Config::find_system()
    } else {
        git2::Config::find_global()
    };
    match found {
        Ok(path) => Ok(path),
        Err(_) => default_scope_path(system).ok_or_else(|| {
            GitError::ConfigUnavailable(format!(
                "cannot locate the {} git configuration file",
                if system { "system" } else { "global" }
            ))
        }),
    }
}

/// The conventional configuration path for a scope.
fn default_scope_path(system: bool) -> Option<PathBuf> {
    if system {
        if cfg!(windows) {
            std::env::var_os("PROGRAMDATA")
                .map(|data| PathBuf::from(data).join("Git").join("config"))
        } else {
            Some(PathBuf::from("/etc/gitconfig"))
        }
    } else {
        dirs::home_dir().map(|home| home.join(".gitconfig"))
    }
}

/// Escape a literal string for use inside a libgit2 multivar regexp.
fn regex_escape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
