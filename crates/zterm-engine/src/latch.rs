//! One-shot closable latch.
//!
//! A latch starts open and can be closed exactly once; closing again is a
//! no-op. Any number of tasks can wait for the close, before or after it
//! happens. Built on `tokio::sync::watch` so waiting composes with
//! `tokio::select!`.

use std::sync::Arc;

use tokio::sync::watch;

/// Closable latch observable by any number of waiters.
#[derive(Debug, Clone)]
pub struct Latch {
    tx: Arc<watch::Sender<bool>>,
}

impl Latch {
    /// Create an open latch.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Close the latch. Safe to call any number of times from any task.
    pub fn close(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the latch has been closed.
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the latch closes. Returns immediately if already closed.
    ///
    /// Cancel safe: dropping the future has no effect on the latch.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone; cannot close anymore, treat as closed so
                // waiters do not hang on an abandoned latch.
                return;
            }
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}
