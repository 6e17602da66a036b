//! Tracing setup for the `confab` binary.
//!
//! Diagnostics go to stderr so they never interleave with the chat
//! transcript on stdout. Audit records are a separate concern and flow
//! through the audit port regardless of the filter configured here.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// Reads the `RUST_LOG` env var and defaults to `warn` if unset.
/// Output: stderr, compact format. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
