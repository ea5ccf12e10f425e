//! Logging setup for the runner.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(verbose: bool) -> Result<()> {
    // RUST_LOG wins over the built-in defaults
    let default_filter = if verbose {
        "debug,immsim_world=debug"
    } else {
        "info,immsim_world=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
