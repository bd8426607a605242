//! ComTunnel Library
//!
//! Exposes a local serial port to a remote peer over a byte stream: serial
//! data and modem handshake lines travel as small length-prefixed frames.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::bridge::{ConnectionBridge, SessionReport};
pub use crate::core::packet::{Packet, PacketType};
pub use crate::domain::config::SerialLineConfig;
pub use crate::domain::error::{ComTunnelError, ComTunnelResult, DeviceError, FrameError};
pub use crate::infrastructure::network::{ConnectionSupervisor, Endpoint, Role};
pub use crate::infrastructure::serial::{ModemStatus, SerialOpener, SerialPortAdapter};
