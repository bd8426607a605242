use super::adapter::{ModemStatus, SerialOpener, SerialPortAdapter};
use crate::domain::{
    config::SerialMode,
    error::{DeviceError, DeviceResult},
};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Blocking reads give up after this long so a cancelled session can release the port
const IO_TIMEOUT: Duration = Duration::from_millis(100);

type PortSlot = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

/// Opens real devices through the `serialport` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwareOpener;

#[async_trait]
impl SerialOpener for HardwareOpener {
    async fn open(
        &self,
        address: &str,
        mode: &SerialMode,
    ) -> DeviceResult<Arc<dyn SerialPortAdapter>> {
        let data_bits = match mode.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => {
                return Err(DeviceError::Unsupported(format!(
                    "data bits: {}",
                    other
                )))
            }
        };

        let builder = serialport::new(address, mode.baud_rate)
            .data_bits(data_bits)
            .stop_bits(mode.stop_bits.into())
            .parity(mode.parity.into())
            .flow_control(serialport::FlowControl::None)
            .timeout(IO_TIMEOUT);

        let port = tokio::task::spawn_blocking(move || -> DeviceResult<_> {
            let reader = builder.open()?;
            let control = reader.try_clone()?;
            Ok((reader, control))
        })
        .await
        .map_err(join_error)??;

        info!("Serial port {} opened ({})", address, mode);

        Ok(Arc::new(HardwarePort {
            name: address.to_string(),
            reader: Arc::new(Mutex::new(Some(port.0))),
            control: Arc::new(Mutex::new(Some(port.1))),
        }))
    }
}

/// A device opened by [`HardwareOpener`].
///
/// Holds two handles onto the same device: one used only by the reading task
/// and one for writes and modem line access, so a pending read never blocks
/// the other direction.
pub struct HardwarePort {
    name: String,
    reader: PortSlot,
    control: PortSlot,
}

impl HardwarePort {
    async fn with_port<T, F>(slot: &PortSlot, op: F) -> DeviceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Box<dyn SerialPort>) -> DeviceResult<T> + Send + 'static,
    {
        let slot = Arc::clone(slot);
        tokio::task::spawn_blocking(move || {
            let mut guard = slot.lock().map_err(|_| {
                DeviceError::Io(io::Error::new(io::ErrorKind::Other, "port lock poisoned"))
            })?;
            let port = guard.as_mut().ok_or(DeviceError::Closed)?;
            op(port)
        })
        .await
        .map_err(join_error)?
    }
}

#[async_trait]
impl SerialPortAdapter for HardwarePort {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, buffer: &mut [u8]) -> DeviceResult<usize> {
        let capacity = buffer.len();
        loop {
            let chunk = Self::with_port(&self.reader, move |port| {
                let mut chunk = vec![0u8; capacity];
                match port.read(&mut chunk) {
                    Ok(n) => {
                        chunk.truncate(n);
                        Ok(chunk)
                    }
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Vec::new()),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

            if !chunk.is_empty() {
                buffer[..chunk.len()].copy_from_slice(&chunk);
                return Ok(chunk.len());
            }
        }
    }

    async fn write(&self, data: &[u8]) -> DeviceResult<usize> {
        let data = data.to_vec();
        Self::with_port(&self.control, move |port| {
            let mut written = 0;
            while written < data.len() {
                match port.write(&data[written..]) {
                    Ok(0) => {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "serial port accepted no bytes",
                        )
                        .into())
                    }
                    Ok(n) => written += n,
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            port.flush()?;
            Ok(written)
        })
        .await
    }

    async fn modem_status(&self) -> DeviceResult<ModemStatus> {
        Self::with_port(&self.control, |port| {
            Ok(ModemStatus {
                cts: port.read_clear_to_send()?,
                dsr: port.read_data_set_ready()?,
                dcd: port.read_carrier_detect()?,
                ri: port.read_ring_indicator()?,
            })
        })
        .await
    }

    async fn set_dtr(&self, level: bool) -> DeviceResult<()> {
        Self::with_port(&self.control, move |port| {
            port.write_data_terminal_ready(level)?;
            Ok(())
        })
        .await
    }

    async fn set_rts(&self, level: bool) -> DeviceResult<()> {
        Self::with_port(&self.control, move |port| {
            port.write_request_to_send(level)?;
            Ok(())
        })
        .await
    }

    async fn close(&self) {
        // The reader slot stays locked until an in-flight read times out
        let slots = [Arc::clone(&self.reader), Arc::clone(&self.control)];
        let released = tokio::task::spawn_blocking(move || {
            for slot in slots {
                if let Ok(mut guard) = slot.lock() {
                    guard.take();
                }
            }
        })
        .await;

        match released {
            Ok(()) => debug!("Serial port {} closed", self.name),
            Err(e) => warn!("Failed to release serial port {}: {}", self.name, e),
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> DeviceError {
    DeviceError::Io(io::Error::new(io::ErrorKind::Other, err))
}
