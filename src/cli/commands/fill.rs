//! cli::commands::fill
//!
//! The protocol commands: `get`, `store`, `erase`.
//!
//! Each reads one request dictionary from standard input, routes it through
//! the registry, and (for `get` only) writes the credential dictionary back
//! to standard output. A provider declining a `get` produces no output and
//! exit code 0, which tells Git to prompt or fall through to the next
//! helper.

use std::io::Write;

use crate::error::Result;
use crate::protocol::{self, Request};
use crate::providers::Registry;
use crate::settings::Settings;
use crate::ui::trace;

/// Serve a `get`.
pub async fn get(registry: &Registry, settings: &Settings) -> Result<()> {
    let request = read_validated_request()?;
    let provider = select(registry, settings, &request)?;
    trace::trace(format!(
        "get for {}://{} via {}",
        request.protocol().unwrap_or_default(),
        request.host().unwrap_or_default(),
        provider.display_name()
    ));

    match provider.get(&request).await? {
        Some(credential) => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            protocol::write_response(&mut out, &request, &credential)?;
            out.flush()?;
            Ok(())
        }
        None => {
            trace::trace("provider declined; deferring to Git");
            Ok(())
        }
    }
}

/// Serve a `store`. Nothing is written to standard output on success.
pub async fn store(registry: &Registry, settings: &Settings) -> Result<()> {
    let request = read_validated_request()?;
    let provider = select(registry, settings, &request)?;
    provider.store(&request).await
}

/// Serve an `erase`. Nothing is written to standard output on success.
pub async fn erase(registry: &Registry, settings: &Settings) -> Result<()> {
    let request = read_validated_request()?;
    let provider = select(registry, settings, &request)?;
    provider.erase(&request).await
}

fn read_validated_request() -> Result<Request> {
    let stdin = std::io::stdin();
    let request = protocol::read_request(&mut stdin.lock())?;
    request.require_protocol_and_host()?;
    Ok(request)
}

fn select<'a>(
    registry: &'a Registry,
    settings: &Settings,
    request: &Request,
) -> Result<&'a crate::providers::HostProvider> {
    let uri = request.remote_uri();
    let forced = settings.provider_override(uri.as_ref());
    registry.select(request, forced.as_deref())
}
