//! Log output for the self-test binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`
/// (default `ring_selftest=info`).
///
/// Call once, at the start of the binary. Library code and tests never do.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ring_selftest=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}
