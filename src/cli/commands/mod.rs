//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! `configure`, `unconfigure`, and `version` run synchronously and never
//! touch standard input. The protocol commands (`get`, `store`, `erase`)
//! read a request dictionary first, then run on a tokio runtime so the
//! OAuth flows can await network and loopback I/O; Ctrl-C races the
//! command via `select!` and maps to the cancellation exit code.

mod configure;
mod fill;
mod version;

use std::sync::{Arc, Mutex};

use crate::azure::AzureReposCache;
use crate::cli::args::Command;
use crate::error::{Error, Result};
use crate::providers::{ProviderContext, Registry};
use crate::secrets::{self, Backend};
use crate::settings::Settings;
use crate::ui::TerminalPrompter;
use crate::vault::CredentialVault;

pub use configure::{configure, unconfigure};
pub use version::version;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, settings: Settings) -> Result<()> {
    match command {
        Command::Version => version(),
        Command::Configure { system } => configure(system),
        Command::Unconfigure { system } => unconfigure(system),
        Command::Get | Command::Store | Command::Erase => run_protocol(command, settings),
    }
}

/// Run one of the protocol commands under a tokio runtime with Ctrl-C
/// cancellation.
fn run_protocol(command: Command, settings: Settings) -> Result<()> {
    let registry = build_registry(settings)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("cannot start async runtime: {}", e)))?;

    runtime.block_on(async {
        tokio::select! {
            result = run_command(command, &registry) => result,
            _ = tokio::signal::ctrl_c() => Err(Error::Canceled),
        }
    })
}

async fn run_command(command: Command, registry: &BuiltRegistry) -> Result<()> {
    match command {
        Command::Get => fill::get(&registry.registry, &registry.settings).await,
        Command::Store => fill::store(&registry.registry, &registry.settings).await,
        Command::Erase => fill::erase(&registry.registry, &registry.settings).await,
        _ => Err(Error::Internal("not a protocol command".into())),
    }
}

/// The provider registry plus the settings it was built from.
struct BuiltRegistry {
    registry: Registry,
    settings: Arc<Settings>,
}

/// Wire up stores, prompter, cache, and providers.
fn build_registry(settings: Settings) -> Result<BuiltRegistry> {
    let settings = Arc::new(settings);

    let backend = match settings.credential_backend() {
        Some(name) => Backend::parse(&name)
            .ok_or_else(|| Error::Internal(format!("unknown credential store '{}'", name)))?,
        None => Backend::Keychain,
    };
    let store = secrets::create_store(backend, settings.plaintext_store_path())?;
    let vault = Arc::new(CredentialVault::new(settings.namespace(), store));

    // The `credential.interactive` gate is resolved per request inside the
    // providers, where the remote URL is known and URL-scoped configuration
    // applies (a scoped `interactive=true` must beat an unscoped `false`).
    // Resolving it here, before the request is read, would pin the unscoped
    // answer for the whole process. The prompter itself only requires a
    // controlling terminal, which it probes on each prompt.
    let prompter = Arc::new(TerminalPrompter::new(true));
    let azure_cache = Arc::new(Mutex::new(AzureReposCache::open_default()?));

    let ctx = ProviderContext {
        settings: settings.clone(),
        vault,
        prompter,
        azure_cache,
    };

    Ok(BuiltRegistry {
        registry: Registry::with_default_providers(&ctx),
        settings,
    })
}
