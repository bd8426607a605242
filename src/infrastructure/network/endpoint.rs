use crate::domain::error::{ComTunnelError, ComTunnelResult};
use std::net::SocketAddr;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::warn;

/// Any byte stream a session can run over
pub trait NetworkStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> NetworkStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

pub type BoxedStream = Box<dyn NetworkStream>;

/// Address family restriction for TCP endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    Any,
    V4,
    V6,
}

impl IpFamily {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            IpFamily::Any => true,
            IpFamily::V4 => addr.is_ipv4(),
            IpFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// A parsed `scheme://address` network location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { address: String, family: IpFamily },
    #[cfg(unix)]
    Unix(std::path::PathBuf),
}

impl FromStr for Endpoint {
    type Err = ComTunnelError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let (scheme, address) = match url.split_once("://") {
            Some((scheme, address)) => (scheme, address),
            None => ("tcp", url),
        };

        if address.is_empty() {
            return Err(ComTunnelError::InvalidAddress(format!(
                "missing address in '{}'",
                url
            )));
        }

        let tcp = |family| Endpoint::Tcp {
            address: address.to_string(),
            family,
        };

        match scheme {
            "tcp" => Ok(tcp(IpFamily::Any)),
            "tcp4" => Ok(tcp(IpFamily::V4)),
            "tcp6" => Ok(tcp(IpFamily::V6)),
            #[cfg(unix)]
            "unix" => Ok(Endpoint::Unix(address.into())),
            other => Err(ComTunnelError::InvalidAddress(format!(
                "unsupported scheme '{}' in '{}'",
                other, url
            ))),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp { address, family } => {
                let scheme = match family {
                    IpFamily::Any => "tcp",
                    IpFamily::V4 => "tcp4",
                    IpFamily::V6 => "tcp6",
                };
                write!(f, "{}://{}", scheme, address)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

impl Endpoint {
    async fn resolve(address: &str, family: IpFamily) -> ComTunnelResult<Vec<SocketAddr>> {
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(address)
            .await?
            .filter(|addr| family.accepts(addr))
            .collect();

        if candidates.is_empty() {
            return Err(ComTunnelError::InvalidAddress(format!(
                "no {:?} address found for '{}'",
                family, address
            )));
        }
        Ok(candidates)
    }

    pub async fn bind(&self) -> ComTunnelResult<NetworkListener> {
        match self {
            Endpoint::Tcp { address, family } => {
                let candidates = Self::resolve(address, *family).await?;
                let listener = TcpListener::bind(candidates.as_slice()).await?;
                Ok(NetworkListener::Tcp(listener))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let listener = tokio::net::UnixListener::bind(path)?;
                Ok(NetworkListener::Unix(listener))
            }
        }
    }

    /// Dial the endpoint, returning the stream and a printable peer name
    pub async fn connect(&self) -> ComTunnelResult<(BoxedStream, String)> {
        match self {
            Endpoint::Tcp { address, family } => {
                let candidates = Self::resolve(address, *family).await?;
                let stream = TcpStream::connect(candidates.as_slice()).await?;
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Failed to set TCP_NODELAY: {}", e);
                }
                let peer = stream
                    .peer_addr()
                    .map(|addr| addr.to_string())
                    .unwrap_or_else(|_| address.clone());
                Ok((Box::new(stream), peer))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok((Box::new(stream), path.display().to_string()))
            }
        }
    }
}

/// A bound listener for any supported endpoint
pub enum NetworkListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener),
}

impl NetworkListener {
    pub fn local_addr(&self) -> String {
        match self {
            NetworkListener::Tcp(listener) => listener
                .local_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "<unknown>".to_string()),
            #[cfg(unix)]
            NetworkListener::Unix(listener) => listener
                .local_addr()
                .ok()
                .and_then(|addr| addr.as_pathname().map(|p| p.display().to_string()))
                .unwrap_or_else(|| "<unnamed>".to_string()),
        }
    }

    pub async fn accept(&self) -> ComTunnelResult<(BoxedStream, String)> {
        match self {
            NetworkListener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Failed to set TCP_NODELAY: {}", e);
                }
                Ok((Box::new(stream), addr.to_string()))
            }
            #[cfg(unix)]
            NetworkListener::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok((Box::new(stream), "unix peer".to_string()))
            }
        }
    }
}
