use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation flag shared by every stage of a run.
///
/// Cancelling never interrupts in-flight work; stages check the flag before
/// dispatching anything new.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
