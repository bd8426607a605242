use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation shared by the tasks of one session.
///
/// Any clone may cancel; every clone observes it. Cancelling is idempotent
/// and cannot be undone.
#[derive(Debug, Clone)]
pub struct SessionScope {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl SessionScope {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes once the scope has been cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for SessionScope {
    fn default() -> Self {
        Self::new()
    }
}
