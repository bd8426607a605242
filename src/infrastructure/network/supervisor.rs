use super::endpoint::{Endpoint, NetworkListener};
use crate::core::bridge::{ConnectionBridge, SessionReport};
use crate::domain::error::ComTunnelResult;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pause between failed dial attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Which side of the TCP connection this process takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Listen(Endpoint),
    Connect(Endpoint),
}

/// Accepts or dials connections and runs one bridge session per connection.
///
/// Sessions run one at a time: the serial device can only belong to one peer.
pub struct ConnectionSupervisor {
    bridge: ConnectionBridge,
    retry_delay: Duration,
}

impl ConnectionSupervisor {
    pub fn new(bridge: ConnectionBridge) -> Self {
        Self {
            bridge,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Run until a listener fails. Dialing never gives up.
    pub async fn run(&self, role: &Role) -> ComTunnelResult<()> {
        match role {
            Role::Listen(endpoint) => {
                let listener = endpoint.bind().await?;
                self.serve(listener).await
            }
            Role::Connect(endpoint) => self.dial_forever(endpoint).await,
        }
    }

    /// Accept connections on a bound listener until accepting fails
    pub async fn serve(&self, listener: NetworkListener) -> ComTunnelResult<()> {
        info!("Listening on {}", listener.local_addr());
        loop {
            let (stream, peer) = listener.accept().await.map_err(|e| {
                error!("Failed to accept connection: {}", e);
                e
            })?;
            info!("New connection from {}", peer);

            match self.bridge.run(stream, &peer).await {
                Ok(report) => info!("Finished {}", report),
                Err(e) => error!("Connection handler error: {}", e),
            }
        }
    }

    async fn dial_forever(&self, endpoint: &Endpoint) -> ComTunnelResult<()> {
        info!("Connecting to {}", endpoint);
        loop {
            match self.connect_once(endpoint).await {
                Ok(report) => info!("Finished {}", report),
                Err(e) => {
                    warn!(
                        "Connection failed: {}; retrying in {:?}",
                        e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Dial once and run a session on the resulting connection
    pub async fn connect_once(&self, endpoint: &Endpoint) -> ComTunnelResult<SessionReport> {
        let (stream, peer) = endpoint.connect().await?;
        info!("Connected to {}", peer);
        self.bridge.run(stream, &peer).await
    }
}
