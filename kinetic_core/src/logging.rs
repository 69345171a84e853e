//! Tracing setup for the `kinetic` binary.
//!
//! Diagnostics always go to stderr; stdout belongs to session output so it
//! can be piped or asserted on.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Warnings only, or everything down to debug with `verbose`.
/// `RUST_LOG` overrides both.
pub fn init(verbose: bool) {
    init_with_level(if verbose { "debug" } else { "warn" })
}

pub fn init_with_level(default_level: &str) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::registry()
        .with(build_filter(env.as_deref(), default_level))
        .with(
            fmt::layer()
                .compact()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// A malformed `RUST_LOG` is ignored rather than silencing everything
fn build_filter(directives: Option<&str>, fallback: &str) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(fallback).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
