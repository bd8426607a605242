// Logging module - Logging infrastructure
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

/// Default filter when `RUST_LOG` is not set
pub fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "comtunnel=debug,warn"
    } else if quiet {
        "comtunnel=warn,error"
    } else {
        "comtunnel=info,warn"
    }
}

/// Initialize logging system
pub fn init_logging(verbose: bool, quiet: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_thread_ids(verbose)
                .with_file(verbose)
                .with_line_number(verbose)
        )
        .try_init()?;

    tracing::debug!("ComTunnel logging system initialized");
    Ok(())
}
