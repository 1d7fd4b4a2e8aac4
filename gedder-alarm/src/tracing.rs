//! Logging setup.
//!
//! Modules pull the macros in through [`prelude`] so the call sites read the
//! same everywhere. Binaries call [`init_journald_or_stdout`] once at startup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
}

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to journald when it is reachable, otherwise to stdout.
///
/// `RUST_LOG` overrides the default `info` filter in both cases.
pub fn init_journald_or_stdout() {
    match tracing_journald::layer() {
        Ok(journald) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(journald)
                .init();
        }
        Err(_) => init_stdout(),
    }
}

/// Log to stdout with local timestamps.
pub fn init_stdout() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_timer(fmt::time::LocalTime::rfc_3339()))
        .init();
}
