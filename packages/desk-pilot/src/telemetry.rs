//! Tracing initialization: logfmt lines, env-filtered.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("DESK_PILOT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_logfmt::layer())
        .try_init();
}
