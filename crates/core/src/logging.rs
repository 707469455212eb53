//! Tracing subscriber setup for embedders and tests.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `folio_core=debug`.
pub const LOG_ENV: &str = "FOLIO_LOG";

/// Install a global fmt subscriber.
///
/// The filter comes from `FOLIO_LOG`, falling back to `default_filter`.
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
