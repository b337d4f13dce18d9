//! cli::commands::configure
//!
//! Register or remove the helper in Git configuration.
//!
//! `configure` appends this executable to the `credential.helper` multivar
//! (global scope by default, `--system` for machine-wide); `unconfigure`
//! removes exactly the entries naming this executable, restoring the prior
//! state for any other configured helpers.

use crate::error::{Error, Result};
use crate::git;

/// Register the helper.
pub fn configure(system: bool) -> Result<()> {
    let path = helper_path()?;
    git::configure_helper(&path, system)?;
    eprintln!(
        "Configured {} as a credential helper ({} scope).",
        path,
        scope_name(system)
    );
    Ok(())
}

/// Remove the helper.
pub fn unconfigure(system: bool) -> Result<()> {
    let path = helper_path()?;
    git::unconfigure_helper(&path, system)?;
    eprintln!(
        "Removed {} from the configured credential helpers ({} scope).",
        path,
        scope_name(system)
    );
    Ok(())
}

fn helper_path() -> Result<String> {
    let exe = std::env::current_exe()
        .map_err(|e| Error::Internal(format!("cannot resolve helper path: {}", e)))?;
    Ok(exe.to_string_lossy().into_owned())
}

fn scope_name(system: bool) -> &'static str {
    if system {
        "system"
    } else {
        "global"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_names() {
        assert_eq!(scope_name(true), "system");
        assert_eq!(scope_name(false), "global");
    }

    #[test]
    fn helper_path_resolves() {
        let path = helper_path().expect("path");
        assert!(!path.is_empty());
    }
}
