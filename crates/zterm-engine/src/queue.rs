//! The UI update queue.
//!
//! The terminal front-end enforces a single-threaded render model: every
//! panel-buffer mutation and every panel-collection change happens on the
//! render thread, which drains this queue between input polls. Engine tasks
//! post closures; two sentinels ask the main loop to quit or to hand the
//! real terminal to an interactive child.

use tokio::sync::mpsc;

/// A message for the render thread.
pub enum UiMessage {
    /// Run a closure on the render thread.
    Update(Box<dyn FnOnce() + Send>),
    /// Leave the main loop.
    Quit,
    /// Tear the terminal down and start the suspend handshake.
    Suspend,
}

/// Sender half, held by engine tasks.
#[derive(Clone)]
pub struct UiQueue {
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl UiQueue {
    pub fn new() -> (UiQueue, UiReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (UiQueue { tx }, UiReceiver { rx })
    }

    /// Post a closure to run on the render thread. Messages posted after the
    /// UI has gone are dropped silently.
    pub fn update(&self, f: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(UiMessage::Update(Box::new(f)));
    }

    /// Ask the main loop to quit.
    pub fn quit(&self) {
        let _ = self.tx.send(UiMessage::Quit);
    }

    /// Ask the main loop to suspend the terminal.
    pub fn suspend(&self) {
        let _ = self.tx.send(UiMessage::Suspend);
    }
}

/// Receiver half, owned by the render thread.
pub struct UiReceiver {
    rx: mpsc::UnboundedReceiver<UiMessage>,
}

impl UiReceiver {
    /// Next message if one is already queued.
    pub fn try_next(&mut self) -> Option<UiMessage> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next message.
    pub async fn recv(&mut self) -> Option<UiMessage> {
        self.rx.recv().await
    }
}
