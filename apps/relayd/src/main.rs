//! Filegate relay daemon entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting filegate relay"
    );

    // Load configuration (first CLI argument, or relayd.toml next to the cwd).
    let path = std::env::args().nth(1);
    let config = config::Config::load(path.as_deref())?;
    tracing::info!(
        source_dir = %config.transfer.source_dir,
        listener_queue = %config.listener_queue,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("relay shut down cleanly");
    Ok(())
}
