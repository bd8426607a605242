use super::flow::{ControlLines, FlowMapping};
use super::scope::SessionScope;
use super::writer::FrameWriter;
use crate::core::packet::{read_packet, Packet, PacketType, MAX_PAYLOAD_LEN};
use crate::domain::{
    config::SerialLineConfig,
    error::{ComTunnelError, ComTunnelResult, DeviceError, FrameError},
};
use crate::infrastructure::serial::{SerialOpener, SerialPortAdapter};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// How often the poller samples the modem lines
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub peer: String,
    pub bytes_to_device: u64,
    pub bytes_from_device: u64,
    pub flow_updates_sent: u64,
    pub duration: Duration,
}

impl std::fmt::Display for SessionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "session {} with {}: {} bytes to device, {} bytes from device, {} flow updates, {:.1}s",
            self.session_id,
            self.peer,
            self.bytes_to_device,
            self.bytes_from_device,
            self.flow_updates_sent,
            self.duration.as_secs_f64()
        )
    }
}

#[derive(Debug, Default)]
struct SessionCounters {
    bytes_to_device: AtomicU64,
    bytes_from_device: AtomicU64,
    flow_updates_sent: AtomicU64,
}

/// Runs sessions that pair one network stream with one serial device.
///
/// A session opens the device, then forwards in both directions with three
/// tasks sharing a [`SessionScope`]:
///
/// - inbound: frames from the peer to device writes and DTR/RTS changes
/// - outbound: device reads to `Data` frames
/// - poller: modem line changes to `Flow` frames
///
/// The first task to hit a fatal error cancels the scope; the others stop at
/// their next wait, including a network write stuck on a peer that stopped
/// reading. The device and the stream are closed once, after all three tasks
/// have finished.
#[derive(Clone)]
pub struct ConnectionBridge {
    config: Arc<SerialLineConfig>,
    opener: Arc<dyn SerialOpener>,
    poll_interval: Duration,
}

impl ConnectionBridge {
    pub fn new(config: Arc<SerialLineConfig>, opener: Arc<dyn SerialOpener>) -> Self {
        Self {
            config,
            opener,
            poll_interval: STATUS_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn config(&self) -> &SerialLineConfig {
        &self.config
    }

    /// Serve one connection until either side fails.
    ///
    /// Returns an error only when the session could not start (bad line
    /// settings or the device would not open). Once running, the session
    /// always ends with a report; the reason it ended is only logged.
    pub async fn run<S>(&self, stream: S, peer: &str) -> ComTunnelResult<SessionReport>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mode = self.config.to_mode()?;
        let device = self
            .opener
            .open(&self.config.address, &mode)
            .await
            .map_err(|source| ComTunnelError::Open {
                address: self.config.address.clone(),
                source,
            })?;

        let session_id = Uuid::new_v4();
        let span = info_span!("session", id = %session_id.simple(), peer = %peer);
        self.forward(session_id, peer, stream, device)
            .instrument(span)
            .await
    }

    async fn forward<S>(
        &self,
        session_id: Uuid,
        peer: &str,
        stream: S,
        device: Arc<dyn SerialPortAdapter>,
    ) -> ComTunnelResult<SessionReport>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        info!("Serial port {} attached to {}", device.name(), peer);
        let started = Instant::now();

        let (reader, writer) = tokio::io::split(stream);
        let writer = Arc::new(FrameWriter::new(writer));
        let scope = SessionScope::new();
        let counters = Arc::new(SessionCounters::default());
        let mapping = FlowMapping::from_config(&self.config);

        let inbound = tokio::spawn(
            supervise(
                "inbound",
                scope.clone(),
                inbound_task(reader, Arc::clone(&device), scope.clone(), Arc::clone(&counters)),
            )
            .in_current_span(),
        );
        let outbound = tokio::spawn(
            supervise(
                "outbound",
                scope.clone(),
                outbound_task(
                    Arc::clone(&device),
                    Arc::clone(&writer),
                    scope.clone(),
                    Arc::clone(&counters),
                ),
            )
            .in_current_span(),
        );
        let poller = tokio::spawn(
            supervise(
                "status poller",
                scope.clone(),
                poller_task(
                    Arc::clone(&device),
                    Arc::clone(&writer),
                    mapping,
                    self.poll_interval,
                    scope.clone(),
                    Arc::clone(&counters),
                ),
            )
            .in_current_span(),
        );

        let (inbound, outbound, poller) = tokio::join!(inbound, outbound, poller);
        for (task, result) in [("inbound", inbound), ("outbound", outbound), ("status poller", poller)] {
            if let Err(e) = result {
                error!("{} task aborted: {}", task, e);
            }
        }

        if let Err(e) = writer.close().await {
            warn!("Failed to shut down network stream: {}", e);
        }
        device.close().await;

        let report = SessionReport {
            session_id,
            peer: peer.to_string(),
            bytes_to_device: counters.bytes_to_device.load(Ordering::Relaxed),
            bytes_from_device: counters.bytes_from_device.load(Ordering::Relaxed),
            flow_updates_sent: counters.flow_updates_sent.load(Ordering::Relaxed),
            duration: started.elapsed(),
        };
        info!("Connection closed");
        Ok(report)
    }
}

/// Run one session task and cancel the scope when it stops for any reason.
async fn supervise<F>(task: &'static str, scope: SessionScope, work: F)
where
    F: std::future::Future<Output = ComTunnelResult<()>>,
{
    match work.await {
        Ok(()) => debug!("{} task stopped", task),
        Err(ComTunnelError::Frame(FrameError::ConnectionClosed)) => {
            info!("{} task: connection closed by peer", task)
        }
        Err(e) if scope.is_cancelled() => debug!("{} task failed after cancel: {}", task, e),
        Err(e) => error!("{} task failed: {}", task, e),
    }
    scope.cancel();
}

async fn inbound_task<S>(
    mut reader: ReadHalf<S>,
    device: Arc<dyn SerialPortAdapter>,
    scope: SessionScope,
    counters: Arc<SessionCounters>,
) -> ComTunnelResult<()>
where
    S: AsyncRead + Send,
{
    loop {
        let packet = tokio::select! {
            biased;
            _ = scope.cancelled() => return Ok(()),
            packet = read_packet(&mut reader) => packet?,
        };

        match packet.packet_type {
            PacketType::Data => {
                write_to_device(device.as_ref(), &packet.payload).await?;
                counters
                    .bytes_to_device
                    .fetch_add(packet.payload.len() as u64, Ordering::Relaxed);
                debug!("Wrote {} bytes to serial port", packet.payload.len());
            }
            PacketType::Flow => {
                let Some(&mask) = packet.payload.first() else {
                    warn!("Ignoring flow control packet without payload");
                    continue;
                };
                apply_control_lines(device.as_ref(), mask).await;
            }
            PacketType::Unknown(tag) => {
                warn!(
                    "Ignoring packet of unknown type 0x{:02x} ({} bytes)",
                    tag,
                    packet.payload.len()
                );
            }
        }
    }
}

async fn write_to_device(device: &dyn SerialPortAdapter, data: &[u8]) -> Result<(), DeviceError> {
    let mut written = 0;
    while written < data.len() {
        let n = device.write(&data[written..]).await?;
        if n == 0 {
            return Err(DeviceError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "serial port accepted no bytes",
            )));
        }
        written += n;
    }
    Ok(())
}

/// Mirror the peer's flow byte onto DTR and RTS. Failures are not fatal.
async fn apply_control_lines(device: &dyn SerialPortAdapter, mask: u8) {
    let lines = ControlLines::from_flow_byte(mask);
    debug!("Received flow control status: 0x{:02x}", mask);

    if let Err(e) = device.set_dtr(lines.dtr).await {
        warn!("Failed to set DTR={}: {}", lines.dtr, e);
    }
    if let Err(e) = device.set_rts(lines.rts).await {
        warn!("Failed to set RTS={}: {}", lines.rts, e);
    }
    debug!("Set modem control lines: RTS={}, DTR={}", lines.rts, lines.dtr);
}

async fn outbound_task<W>(
    device: Arc<dyn SerialPortAdapter>,
    writer: Arc<FrameWriter<W>>,
    scope: SessionScope,
    counters: Arc<SessionCounters>,
) -> ComTunnelResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut buffer = [0u8; MAX_PAYLOAD_LEN];
    loop {
        let n = tokio::select! {
            biased;
            _ = scope.cancelled() => return Ok(()),
            n = device.read(&mut buffer) => n?,
        };
        if n == 0 {
            continue;
        }

        debug!("Read {} bytes from serial port", n);
        let packet = Packet::data(buffer[..n].to_vec());
        tokio::select! {
            biased;
            _ = scope.cancelled() => return Ok(()),
            sent = writer.send(&packet) => sent?,
        }
        counters
            .bytes_from_device
            .fetch_add(n as u64, Ordering::Relaxed);
    }
}

async fn poller_task<W>(
    device: Arc<dyn SerialPortAdapter>,
    writer: Arc<FrameWriter<W>>,
    mapping: FlowMapping,
    interval: Duration,
    scope: SessionScope,
    counters: Arc<SessionCounters>,
) -> ComTunnelResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_sent: u8 = 0;
    let mut query_failing = false;

    loop {
        tokio::select! {
            biased;
            _ = scope.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let status = match device.modem_status().await {
            Ok(status) => {
                if query_failing {
                    info!("Modem status available again");
                    query_failing = false;
                }
                status
            }
            Err(e) => {
                if !query_failing {
                    warn!("Failed to read modem status: {}", e);
                    query_failing = true;
                } else {
                    debug!("Failed to read modem status: {}", e);
                }
                continue;
            }
        };

        let mask = mapping.encode(status);
        if mask != last_sent {
            debug!(
                "Modem status changed: CTS={}, DSR={}, DCD={}, RI={} (0x{:02x})",
                status.cts, status.dsr, status.dcd, status.ri, mask
            );
            let packet = Packet::flow(mask);
            tokio::select! {
                biased;
                _ = scope.cancelled() => return Ok(()),
                sent = writer.send(&packet) => sent?,
            }
            last_sent = mask;
            counters.flow_updates_sent.fetch_add(1, Ordering::Relaxed);
        }
    }
}
