use crate::cli::args::Args;
use crate::core::bridge::ConnectionBridge;
use crate::domain::error::{ComTunnelError, ComTunnelResult};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::network::{ConnectionSupervisor, Endpoint, Role};
use crate::infrastructure::serial::HardwareOpener;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Execute the command line: load the line config, then serve until interrupted
pub async fn execute_command(args: Args) -> anyhow::Result<()> {
    if let Err(e) = init_logging(args.verbose, args.quiet) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let role = role_from_args(&args)?;

    let loader = ConfigLoader::new();
    let source = loader.resolve(args.config.as_deref())?;
    let config = loader
        .load(&source)
        .with_context(|| format!("Failed to load serial config from {}", source))?;

    // Reject bad line settings now rather than on the first connection
    let mode = config.to_mode().context("Invalid serial line settings")?;
    info!("Serial line {} at {}", config.address, mode);

    let bridge = ConnectionBridge::new(Arc::new(config), Arc::new(HardwareOpener));
    let supervisor = ConnectionSupervisor::new(bridge)
        .with_retry_delay(Duration::from_secs(args.retry_delay));

    tokio::select! {
        result = supervisor.run(&role) => {
            result.context("Connection supervisor stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

/// Turn the `--listen`/`--connect` pair into a supervisor role
pub fn role_from_args(args: &Args) -> ComTunnelResult<Role> {
    match (&args.listen, &args.connect) {
        (Some(address), None) => Ok(Role::Listen(address.parse::<Endpoint>()?)),
        (None, Some(address)) => Ok(Role::Connect(address.parse::<Endpoint>()?)),
        _ => Err(ComTunnelError::InvalidAddress(
            "must specify exactly one of --listen/-l or --connect/-c".to_string(),
        )),
    }
}
