//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse the subcommand
//! - Assemble the process-wide collaborators (settings, stores, registry)
//! - Dispatch to command handlers and map errors to exit codes
//!
//! The layer is thin: protocol parsing lives in [`crate::protocol`] and all
//! credential logic in [`crate::providers`].

pub mod args;
pub mod commands;

use std::path::Path;

use crate::error::Result;
use crate::git::GitConfig;
use crate::settings::Settings;
use crate::ui::trace;

pub use args::{Cli, Command};

/// Run the helper. This is the entry point called from `main`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    // A missing or unreadable Git configuration must not break `get`:
    // environment variables and defaults still apply.
    let config = GitConfig::snapshot(Path::new(".")).unwrap_or_default();
    let settings = Settings::load(config);

    trace::init(settings.trace_enabled(), settings.trace_secrets());

    commands::dispatch(cli.command, settings)
}
