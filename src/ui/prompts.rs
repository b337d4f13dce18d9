//! ui::prompts
//!
//! Interactive prompts.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode; non-interactive invocations
//! fail with a clear error instead of hanging. Because standard input and
//! output carry the credential protocol, all prompting goes through the
//! controlling terminal (`/dev/tty` on Unix), never the protocol streams.
//!
//! The [`Prompter`] trait is the seam behind which GUI helpers would live;
//! the core only ships the terminal implementation.

use std::fmt::Write as _;
use std::io::{BufRead, BufReader, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("cannot prompt: not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

/// A username/password pair collected from the user.
#[derive(Debug, Clone)]
pub struct BasicPromptResult {
    /// Entered (or preset) username.
    pub username: String,
    /// Entered password. Redacted from `Debug` by never deriving it here;
    /// callers convert into [`crate::vault::Credential`] promptly.
    pub password: String,
}

/// The interactive prompter seam.
///
/// Implementations return either the requested input or
/// [`PromptError::Cancelled`]; they never block when interaction is
/// disabled.
pub trait Prompter: Send + Sync {
    /// Ask for a username and password for `resource`.
    ///
    /// A preset username is shown and reused rather than re-asked.
    fn ask_basic(
        &self,
        resource: &str,
        preset_username: Option<&str>,
    ) -> Result<BasicPromptResult, PromptError>;

    /// Ask for a single secret (e.g. a personal access token).
    fn ask_secret(&self, message: &str) -> Result<String, PromptError>;

    /// Display a device-code sign-in instruction.
    fn show_device_code(&self, user_code: &str, verification_uri: &str)
        -> Result<(), PromptError>;
}

/// Terminal-backed prompter.
///
/// The `credential.interactive` setting is resolved by the callers per
/// request (it is URL-scoped); this type only models whether the session
/// is allowed to prompt at all, and probes for a controlling terminal on
/// each prompt.
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    /// Create a prompter; `interactive = false` makes every prompt fail
    /// with [`PromptError::NotInteractive`].
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    fn ensure_interactive(&self) -> Result<(), PromptError> {
        if self.interactive {
            Ok(())
        } else {
            Err(PromptError::NotInteractive)
        }
    }

    /// Read one line from the controlling terminal, echoing input.
    fn read_line(&self, prompt: &str) -> Result<String, PromptError> {
        let (mut tty_in, mut tty_out) = open_tty()?;
        tty_out
            .write_all(prompt.as_bytes())
            .and_then(|_| tty_out.flush())
            .map_err(|e| PromptError::IoError(e.to_string()))?;

        let mut line = String::new();
        let n = tty_in
            .read_line(&mut line)
            .map_err(|e| PromptError::IoError(e.to_string()))?;
        if n == 0 {
            // EOF on the terminal is a cancellation.
            return Err(PromptError::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read one line without echoing it back.
    fn read_secret_line(&self, prompt: &str) -> Result<String, PromptError> {
        let _echo_guard = EchoGuard::disable();
        let result = self.read_line(prompt);
        drop(_echo_guard);
        if result.is_ok() {
            // The user's Enter was swallowed with echo off.
            let _ = writeln_tty();
        }
        result
    }
}

impl Prompter for TerminalPrompter {
    fn ask_basic(
        &self,
        resource: &str,
        preset_username: Option<&str>,
    ) -> Result<BasicPromptResult, PromptError> {
        self.ensure_interactive()?;

        let mut banner = String::new();
        let _ = writeln!(banner, "Enter credentials for '{}':", resource);
        let (_, mut tty_out) = open_tty()?;
        tty_out
            .write_all(banner.as_bytes())
            .map_err(|e| PromptError::IoError(e.to_string()))?;

        let username = match preset_username {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let entered = self.read_line("Username: ")?;
                if entered.is_empty() {
                    return Err(PromptError::Cancelled);
                }
                entered
            }
        };

        let password = self.read_secret_line("Password: ")?;
        if password.is_empty() {
            return Err(PromptError::Cancelled);
        }

        Ok(BasicPromptResult { username, password })
    }

    fn ask_secret(&self, message: &str) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        let value = self.read_secret_line(&format!("{}: ", message))?;
        if value.is_empty() {
            return Err(PromptError::Cancelled);
        }
        Ok(value)
    }

    fn show_device_code(
        &self,
        user_code: &str,
        verification_uri: &str,
    ) -> Result<(), PromptError> {
        // Device-code instructions go to the terminal when we have one,
        // falling back to stderr in headless sessions.
        let message = format!(
            "To sign in, visit {} and enter the code {}\n",
            verification_uri, user_code
        );
        match open_tty() {
            Ok((_, mut tty_out)) => tty_out
                .write_all(message.as_bytes())
                .and_then(|_| tty_out.flush())
                .map_err(|e| PromptError::IoError(e.to_string())),
            Err(_) => {
                eprint!("{}", message);
                Ok(())
            }
        }
    }
}

#[cfg(unix)]
fn open_tty() -> Result<(BufReader<std::fs::File>, std::fs::File), PromptError> {
    let reader = std::fs::File::open("/dev/tty")
        .map_err(|_| PromptError::NotInteractive)
        .map(BufReader::new)?;
    let writer = std::fs::OpenOptions::new()
        .write(true)
        .open("/dev/tty")
        .map_err(|_| PromptError::NotInteractive)?;
    Ok((reader, writer))
}

#[cfg(not(unix))]
fn open_tty() -> Result<(BufReader<std::io::Stdin>, std::io::Stderr), PromptError> {
    // Without /dev/tty, prompts render on stderr and read stdin. Git has
    // already closed the protocol dictionary by the time we prompt.
    Ok((BufReader::new(std::io::stdin()), std::io::stderr()))
}

fn writeln_tty() -> Result<(), PromptError> {
    let (_, mut tty_out) = open_tty()?;
    tty_out
        .write_all(b"\n")
        .map_err(|e| PromptError::IoError(e.to_string()))
}

/// RAII guard that disables terminal echo for the secret prompt.
struct EchoGuard {
    restored: bool,
}

impl EchoGuard {
    fn disable() -> Self {
        let restored = !set_echo(false);
        Self { restored }
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        if !self.restored {
            set_echo(true);
        }
    }
}

/// Toggle terminal echo. Returns true when the toggle took effect.
///
/// `stty` must act on the controlling terminal, not the helper's standard
/// input (which carries the protocol stream).
#[cfg(unix)]
fn set_echo(on: bool) -> bool {
    use std::process::{Command, Stdio};
    let Ok(tty) = std::fs::File::open("/dev/tty") else {
        return false;
    };
    Command::new("stty")
        .arg(if on { "echo" } else { "-echo" })
        .stdin(Stdio::from(tty))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn set_echo(_on: bool) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_prompter_refuses_to_ask() {
        let prompter = TerminalPrompter::new(false);

        let err = prompter.ask_basic("https://github.com", None).unwrap_err();
        assert!(matches!(err, PromptError::NotInteractive));

        let err = prompter.ask_secret("Token").unwrap_err();
        assert!(matches!(err, PromptError::NotInteractive));
    }

    #[test]
    fn prompt_error_messages() {
        assert!(PromptError::Cancelled.to_string().contains("cancelled"));
        assert!(PromptError::NotInteractive
            .to_string()
            .contains("interactive"));
    }
}
