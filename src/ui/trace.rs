//! ui::trace
//!
//! Process-wide tracing.
//!
//! # Design
//!
//! The tracer is the one piece of legitimate process-wide state: it is
//! initialized once at startup from `GCM_TRACE` / `GCM_TRACE_SECRETS` and
//! referenced read-only from everywhere. Output goes to standard error so
//! it never mixes with the protocol stream.
//!
//! # Security
//!
//! Secret values are replaced with a fixed mask unless secret tracing was
//! explicitly enabled.

use std::fmt::Display;
use std::sync::OnceLock;

/// Mask substituted for secrets in trace output.
const SECRET_MASK: &str = "********";

#[derive(Debug, Clone, Copy, Default)]
struct TraceConfig {
    enabled: bool,
    secrets: bool,
}

static TRACE: OnceLock<TraceConfig> = OnceLock::new();

/// Initialize tracing. Later calls are ignored.
pub fn init(enabled: bool, secrets: bool) {
    let _ = TRACE.set(TraceConfig { enabled, secrets });
}

fn config() -> TraceConfig {
    TRACE.get().copied().unwrap_or_default()
}

/// Whether tracing is enabled.
pub fn enabled() -> bool {
    config().enabled
}

/// Emit a trace line.
pub fn trace(message: impl Display) {
    if config().enabled {
        eprintln!("trace: {}", message);
    }
}

/// Render a secret for trace output, masked unless secret tracing is on.
pub fn secret(value: &str) -> String {
    if config().secrets {
        value.to_string()
    } else {
        SECRET_MASK.to_string()
    }
}
