//! Capability surface the bridge needs from a serial device.
//!
//! Every method takes `&self` so one handle can be shared by the inbound,
//! outbound and poller tasks of a session. Implementations serialise access
//! internally.

use crate::domain::{config::SerialMode, error::DeviceResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Modem input lines sampled from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModemStatus {
    pub cts: bool,
    pub dsr: bool,
    pub dcd: bool,
    pub ri: bool,
}

/// An open serial device
#[async_trait]
pub trait SerialPortAdapter: Send + Sync {
    /// Device path this handle was opened from
    fn name(&self) -> &str;

    /// Wait until at least one byte is available and copy it into `buffer`
    async fn read(&self, buffer: &mut [u8]) -> DeviceResult<usize>;

    /// Write bytes, returning how many the device accepted
    async fn write(&self, data: &[u8]) -> DeviceResult<usize>;

    /// Sample CTS, DSR, DCD and RI
    async fn modem_status(&self) -> DeviceResult<ModemStatus>;

    /// Drive the DTR output line
    async fn set_dtr(&self, level: bool) -> DeviceResult<()>;

    /// Drive the RTS output line
    async fn set_rts(&self, level: bool) -> DeviceResult<()>;

    /// Release the device. Later calls on the handle fail with `DeviceError::Closed`.
    async fn close(&self);
}

/// Opens serial devices for new sessions
#[async_trait]
pub trait SerialOpener: Send + Sync {
    async fn open(
        &self,
        address: &str,
        mode: &SerialMode,
    ) -> DeviceResult<Arc<dyn SerialPortAdapter>>;
}
