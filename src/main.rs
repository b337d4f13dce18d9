//! Binary entry point for `git-credential-quay`.
//!
//! Exit codes: 0 on success or a benign decline, 1 on fatal failure, 130
//! when the user canceled an interactive flow.

use std::process::ExitCode;

fn main() -> ExitCode {
    match quay::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
