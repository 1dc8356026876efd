//! Ambient logging setup.
//!
//! `isoprenoid`/`flourish` (the crates this library is descended from) don't log at
//! all — a pure signals runtime has no reason to. The eventuals model's scheduler
//! and static thread pool, by contrast, carry a single log-verbosity knob
//! controlling internal trace messages, off by default, so this module
//! wires that variable up to `tracing`.
//!
//! The crate itself never installs a global subscriber — only emits `tracing`
//! events — so embedding applications stay in control of where logs end up.
//! [`init_logging`] is offered purely as a convenience for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Name of the environment variable controlling log verbosity.
///
/// `0` (default) disables logging, `1` is `warn`, `2` is `info`, `3` is `debug`,
/// and `4` or higher is `trace`.
pub const EVENTUALS_LOG_VAR: &str = "EVENTUALS_LOG";

/// Resolves [`EVENTUALS_LOG_VAR`] into a `tracing` level filter string.
#[must_use]
pub fn verbosity_filter() -> &'static str {
    let level: u32 = std::env::var(EVENTUALS_LOG_VAR)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    match level {
        0 => "off",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// Installs a process-global `tracing` subscriber driven by [`EVENTUALS_LOG_VAR`].
///
/// Intended for binaries, examples and tests; library code should never call this,
/// since it unconditionally sets the global default subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(verbosity_filter()))
        .try_init()
        .ok();
}
