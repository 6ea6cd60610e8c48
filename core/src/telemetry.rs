use anyhow::{anyhow, Result};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Directives used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug";

static INSTALLED: OnceLock<Result<(), String>> = OnceLock::new();

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the process-wide subscriber: an env filter plus a compact fmt layer.
///
/// Only the first call installs anything; later and concurrent calls report
/// the outcome of that first attempt, so the server, xtask and tests can all
/// call it.
pub fn init_tracing(filter: EnvFilter) -> Result<()> {
    INSTALLED
        .get_or_init(move || {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().compact().with_target(true));
            tracing::subscriber::set_global_default(subscriber).map_err(|err| err.to_string())
        })
        .clone()
        .map_err(|err| anyhow!("another global tracing subscriber is already installed: {err}"))
}
