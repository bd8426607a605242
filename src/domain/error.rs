use thiserror::Error;

/// Failures of the frame codec on the network stream
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("invalid frame length: {0}")]
    InvalidFrame(u8),

    #[error("frame body of {0} bytes exceeds 255")]
    PayloadTooLarge(usize),

    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Classify an I/O error raised while reading a frame.
    ///
    /// A short read means the peer went away mid-frame, which is reported the
    /// same way as a close before the length byte.
    pub fn from_read(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => FrameError::ConnectionClosed,
            _ => FrameError::Io(err),
        }
    }
}

/// Failures reported by a serial device
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device closed")]
    Closed,

    #[error("Unsupported device setting: {0}")]
    Unsupported(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// ComTunnel unified error type
#[derive(Error, Debug)]
pub enum ComTunnelError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to open serial port {address}: {source}")]
    Open {
        address: String,
        #[source]
        source: DeviceError,
    },

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl ComTunnelError {
    pub fn config(message: impl Into<String>) -> Self {
        ComTunnelError::Config {
            message: message.into(),
        }
    }
}

pub type ComTunnelResult<T> = Result<T, ComTunnelError>;
