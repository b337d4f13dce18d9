//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Git invokes the helper with a single subcommand (`get`, `store`,
//! `erase`); the remaining subcommands are for humans installing or
//! inspecting the helper.

use clap::{Parser, Subcommand};

/// Quay - a universal Git credential helper
#[derive(Parser, Debug)]
#[command(name = "git-credential-quay")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Print help
    ///
    /// Declared by hand so `-?` works alongside `-h`/`--help`.
    #[arg(short = 'h', long = "help", short_alias = '?', action = clap::ArgAction::Help)]
    help: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce a credential for the request on standard input
    Get,

    /// Persist a credential Git has just validated
    Store,

    /// Erase a credential Git has just rejected
    Erase,

    /// Register this helper in Git configuration
    Configure {
        /// Write to the system configuration instead of the global one
        #[arg(long)]
        system: bool,
    },

    /// Remove this helper from Git configuration
    Unconfigure {
        /// Remove from the system configuration instead of the global one
        #[arg(long)]
        system: bool,
    },

    /// Print application, commit, OS, and runtime information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["git-credential-quay", "get"]).expect("parse");
        assert!(matches!(cli.command, Command::Get));

        let cli = Cli::try_parse_from(["git-credential-quay", "store"]).expect("parse");
        assert!(matches!(cli.command, Command::Store));

        let cli = Cli::try_parse_from(["git-credential-quay", "erase"]).expect("parse");
        assert!(matches!(cli.command, Command::Erase));

        let cli = Cli::try_parse_from(["git-credential-quay", "version"]).expect("parse");
        assert!(matches!(cli.command, Command::Version));
    }

    #[test]
    fn configure_takes_system_flag() {
        let cli =
            Cli::try_parse_from(["git-credential-quay", "configure", "--system"]).expect("parse");
        assert!(matches!(cli.command, Command::Configure { system: true }));

        let cli = Cli::try_parse_from(["git-credential-quay", "unconfigure"]).expect("parse");
        assert!(matches!(cli.command, Command::Unconfigure { system: false }));
    }

    #[test]
    fn unknown_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["git-credential-quay", "frobnicate"]).is_err());
        assert!(Cli::try_parse_from(["git-credential-quay"]).is_err());
    }

    #[test]
    fn all_three_help_flags_display_help() {
        use clap::error::ErrorKind;

        for flag in ["--help", "-h", "-?"] {
            let err = Cli::try_parse_from(["git-credential-quay", flag])
                .expect_err("help should short-circuit parsing");
            assert_eq!(err.kind(), ErrorKind::DisplayHelp, "flag {}", flag);
        }
    }
}
