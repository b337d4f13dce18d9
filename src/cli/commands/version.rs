//! cli::commands::version
//!
//! Print application, commit, OS, and runtime information.

use crate::error::Result;

/// Commit hash baked in at build time, when the packaging sets it.
const BUILD_COMMIT: Option<&str> = option_env!("QUAY_BUILD_COMMIT");

/// Print version information.
pub fn version() -> Result<()> {
    println!("{}", version_string());
    println!("os: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    println!("runtime: rust");
    Ok(())
}

fn version_string() -> String {
    match BUILD_COMMIT {
        Some(commit) => format!(
            "git-credential-quay {} ({})",
            env!("CARGO_PKG_VERSION"),
            commit
        ),
        None => format!("git-credential-quay {}", env!("CARGO_PKG_VERSION")),
    }
}
