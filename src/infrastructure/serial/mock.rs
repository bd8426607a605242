//! In-memory serial device for exercising the bridge without hardware.
//!
//! Reads are scripted with [`MockSerialPort::push_read`] and
//! [`MockSerialPort::fail_read`]; a read with nothing queued waits forever,
//! like an idle line. Everything the bridge does to the device is recorded
//! and can be inspected from the test through any clone of the handle.
//! Each open through [`MockOpener`] hands out a fresh handle on the same
//! device, so closing one session's handle does not affect the next.

use super::adapter::{ModemStatus, SerialOpener, SerialPortAdapter};
use crate::domain::{
    config::SerialMode,
    error::{DeviceError, DeviceResult},
};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

#[derive(Debug)]
enum ScriptedRead {
    Data(Vec<u8>),
    Error(io::ErrorKind),
}

#[derive(Debug)]
struct ReadQueue {
    receiver: mpsc::UnboundedReceiver<ScriptedRead>,
    leftover: Vec<u8>,
}

/// Line activity recorded by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    Dtr(bool),
    Rts(bool),
}

#[derive(Debug, Default)]
struct MockPortState {
    written: Vec<Vec<u8>>,
    line_events: Vec<LineEvent>,
    modem_status: ModemStatus,
    fail_status: bool,
    fail_lines: bool,
    fail_writes: bool,
    status_queries: usize,
    close_count: usize,
    writes_after_close: usize,
}

/// Mock serial port; clones share the same device state and handle
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    closed: Arc<AtomicBool>,
    state: Arc<Mutex<MockPortState>>,
    reads: Arc<tokio::sync::Mutex<ReadQueue>>,
    read_sender: mpsc::UnboundedSender<ScriptedRead>,
}

impl MockSerialPort {
    pub fn new(name: impl Into<String>) -> Self {
        let (read_sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            closed: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(MockPortState::default())),
            reads: Arc::new(tokio::sync::Mutex::new(ReadQueue {
                receiver,
                leftover: Vec::new(),
            })),
            read_sender,
        }
    }

    /// A new open handle on the same device
    pub fn reopen(&self) -> Self {
        Self {
            closed: Arc::new(AtomicBool::new(false)),
            ..self.clone()
        }
    }

    fn state(&self) -> MutexGuard<'_, MockPortState> {
        // A panic in another test thread must not hide this test's assertions
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes for the next read
    pub fn push_read(&self, data: &[u8]) {
        let _ = self.read_sender.send(ScriptedRead::Data(data.to_vec()));
    }

    /// Make the next read fail
    pub fn fail_read(&self, kind: io::ErrorKind) {
        let _ = self.read_sender.send(ScriptedRead::Error(kind));
    }

    pub fn set_modem_status(&self, status: ModemStatus) {
        self.state().modem_status = status;
    }

    pub fn set_fail_status(&self, fail: bool) {
        self.state().fail_status = fail;
    }

    pub fn set_fail_lines(&self, fail: bool) {
        self.state().fail_lines = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Every successful write, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    pub fn line_events(&self) -> Vec<LineEvent> {
        self.state().line_events.clone()
    }

    pub fn status_queries(&self) -> usize {
        self.state().status_queries
    }

    /// Closes across every handle on this device
    pub fn close_count(&self) -> usize {
        self.state().close_count
    }

    /// Calls made on the handle after it was closed
    pub fn writes_after_close(&self) -> usize {
        self.state().writes_after_close
    }

    fn check_open(&self, state: &mut MockPortState) -> DeviceResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            state.writes_after_close += 1;
            return Err(DeviceError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl SerialPortAdapter for MockSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, buffer: &mut [u8]) -> DeviceResult<usize> {
        let mut queue = self.reads.lock().await;

        if queue.leftover.is_empty() {
            match queue.receiver.recv().await {
                Some(ScriptedRead::Data(data)) => queue.leftover = data,
                Some(ScriptedRead::Error(kind)) => {
                    return Err(DeviceError::Io(io::Error::new(kind, "scripted read failure")))
                }
                None => return Err(DeviceError::Closed),
            }
        }

        let n = queue.leftover.len().min(buffer.len());
        buffer[..n].copy_from_slice(&queue.leftover[..n]);
        queue.leftover.drain(..n);
        Ok(n)
    }

    async fn write(&self, data: &[u8]) -> DeviceResult<usize> {
        let mut state = self.state();
        self.check_open(&mut state)?;
        if state.fail_writes {
            return Err(DeviceError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted write failure",
            )));
        }
        state.written.push(data.to_vec());
        Ok(data.len())
    }

    async fn modem_status(&self) -> DeviceResult<ModemStatus> {
        let mut state = self.state();
        state.status_queries += 1;
        if state.fail_status {
            return Err(DeviceError::Io(io::Error::new(
                io::ErrorKind::Other,
                "scripted status failure",
            )));
        }
        Ok(state.modem_status)
    }

    async fn set_dtr(&self, level: bool) -> DeviceResult<()> {
        let mut state = self.state();
        self.check_open(&mut state)?;
        if state.fail_lines {
            return Err(DeviceError::Unsupported("DTR".to_string()));
        }
        state.line_events.push(LineEvent::Dtr(level));
        Ok(())
    }

    async fn set_rts(&self, level: bool) -> DeviceResult<()> {
        let mut state = self.state();
        self.check_open(&mut state)?;
        if state.fail_lines {
            return Err(DeviceError::Unsupported("RTS".to_string()));
        }
        state.line_events.push(LineEvent::Rts(level));
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.state().close_count += 1;
    }
}

/// Hands out a shared [`MockSerialPort`], or fails every open
#[derive(Clone)]
pub struct MockOpener {
    port: Option<MockSerialPort>,
    opened: Arc<Mutex<Vec<(String, SerialMode)>>>,
}

impl MockOpener {
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port: Some(port),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An opener whose device is never available
    pub fn unavailable() -> Self {
        Self {
            port: None,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Addresses and modes passed to successful opens
    pub fn opened(&self) -> Vec<(String, SerialMode)> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SerialOpener for MockOpener {
    async fn open(
        &self,
        address: &str,
        mode: &SerialMode,
    ) -> DeviceResult<Arc<dyn SerialPortAdapter>> {
        let port = self.port.clone().ok_or_else(|| {
            DeviceError::Io(io::Error::new(io::ErrorKind::NotFound, "no such device"))
        })?;
        if let Ok(mut opened) = self.opened.lock() {
            opened.push((address.to_string(), *mode));
        }
        Ok(Arc::new(port.reopen()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_reads_are_split_by_buffer() {
        let port = MockSerialPort::new("MOCK0");
        port.push_read(b"hello");

        let mut buffer = [0u8; 3];
        assert_eq!(port.read(&mut buffer).await.unwrap(), 3);
        assert_eq!(&buffer, b"hel");
        assert_eq!(port.read(&mut buffer).await.unwrap(), 2);
        assert_eq!(&buffer[..2], b"lo");
    }

    #[tokio::test]
    async fn test_scripted_read_failure() {
        let port = MockSerialPort::new("MOCK0");
        port.fail_read(io::ErrorKind::BrokenPipe);
        let mut buffer = [0u8; 8];
        assert!(port.read(&mut buffer).await.is_err());
    }

    #[tokio::test]
    async fn test_calls_after_close_are_rejected() {
        let port = MockSerialPort::new("MOCK0");
        port.close().await;
        assert!(matches!(port.write(b"x").await, Err(DeviceError::Closed)));
        assert!(port.set_dtr(true).await.is_err());
        assert_eq!(port.writes_after_close(), 2);
        assert_eq!(port.close_count(), 1);
    }

    #[tokio::test]
    async fn test_reopen_after_close_gets_working_handle() {
        let port = MockSerialPort::new("MOCK0");
        let opener = MockOpener::new(port.clone());
        let mode = crate::domain::config::SerialLineConfig::new("MOCK0")
            .to_mode()
            .unwrap();

        let first = opener.open("MOCK0", &mode).await.unwrap();
        first.write(b"a").await.unwrap();
        first.close().await;
        assert!(first.write(b"late").await.is_err());

        let second = opener.open("MOCK0", &mode).await.unwrap();
        second.write(b"b").await.unwrap();
        second.close().await;

        assert_eq!(port.written(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(port.close_count(), 2);
        assert_eq!(port.writes_after_close(), 1);
        assert_eq!(opener.opened().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_opener() {
        let mode = crate::domain::config::SerialLineConfig::new("MOCK0")
            .to_mode()
            .unwrap();
        assert!(MockOpener::unavailable().open("MOCK0", &mode).await.is_err());
    }
}
