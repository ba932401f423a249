//! Structured logging setup.
//!
//! The engine logs through `tracing`; hosts that embed it (and tests that
//! want log output) install a subscriber here instead of wiring their own.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a console subscriber honoring `RUST_LOG`, falling back to the
/// given level. Safe to call repeatedly; later calls are no-ops.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}

/// `init("info")`.
pub fn init_default() {
    init("info");
}
