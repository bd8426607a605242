use crate::core::packet::{write_packet, Packet};
use crate::domain::error::FrameError;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

/// Write half of the network stream, shared by the outbound task and the
/// status poller.
///
/// Each frame is written while holding the lock, so frames from the two
/// writers never interleave. Once closed, every send fails with
/// [`FrameError::ConnectionClosed`] without touching the stream.
pub struct FrameWriter<W> {
    inner: Mutex<Option<W>>,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(Some(writer)),
        }
    }

    pub async fn send(&self, packet: &Packet) -> Result<(), FrameError> {
        let mut guard = self.inner.lock().await;
        let writer = guard.as_mut().ok_or(FrameError::ConnectionClosed)?;
        write_packet(writer, packet).await
    }

    /// Shut the stream down. Only the first call reaches the stream.
    pub async fn close(&self) -> std::io::Result<()> {
        let writer = self.inner.lock().await.take();
        match writer {
            Some(mut writer) => {
                debug!("Shutting down network stream");
                writer.shutdown().await
            }
            None => Ok(()),
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}
