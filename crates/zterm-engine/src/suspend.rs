//! Suspend/resume handshake.
//!
//! When a command needs the real terminal (an interactive editor), it posts
//! [`UiMessage::Suspend`](crate::queue::UiMessage) and waits on the
//! `suspend` latch. The main loop tears the terminal library down, allocates
//! a fresh `resume` latch and closes `suspend`; the command runs its child
//! with inherited stdio and closes `resume` when the child exits. The main
//! loop rebuilds the terminal, re-arms `suspend` and carries on.
//!
//! Renderer bridges also watch the latches so they do not write into a torn
//! down UI.

use std::sync::{Arc, Mutex};

use crate::latch::Latch;

struct SuspendState {
    suspend: Latch,
    resume: Latch,
}

/// Process-wide suspend/resume latch pair.
#[derive(Clone)]
pub struct SuspendCoordinator {
    state: Arc<Mutex<SuspendState>>,
}

impl SuspendCoordinator {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SuspendState {
                suspend: Latch::new(),
                resume: Latch::new(),
            })),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SuspendState) -> T) -> T {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    /// Main loop: the terminal is torn down, let the waiting command run.
    /// Allocates the resume latch for this cycle before closing `suspend`.
    pub fn begin_suspend(&self) {
        self.with_state(|state| {
            state.resume = Latch::new();
            state.suspend.close();
        });
    }

    /// Command side: the interactive child has exited.
    pub fn notify_resumed(&self) {
        self.with_state(|state| state.resume.close());
    }

    /// Main loop: the terminal has been rebuilt, arm a fresh suspend latch.
    pub fn rearm(&self) {
        self.with_state(|state| state.suspend = Latch::new());
    }

    /// Wait until the current cycle's `suspend` latch closes.
    pub async fn suspended(&self) {
        let latch = self.with_state(|state| state.suspend.clone());
        latch.closed().await
    }

    /// Wait until the current cycle's `resume` latch closes.
    pub async fn resumed(&self) {
        let latch = self.with_state(|state| state.resume.clone());
        latch.closed().await
    }
}

impl Default for SuspendCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_full_cycle() {
        let coordinator = SuspendCoordinator::new();

        // Command task: waits for suspend, "runs the editor", resumes.
        let command = {
            let c = coordinator.clone();
            tokio::spawn(async move {
                c.suspended().await;
                c.notify_resumed();
            })
        };

        // Main loop side.
        coordinator.begin_suspend();
        timeout(Duration::from_secs(1), coordinator.resumed())
            .await
            .expect("resume must follow suspend");
        coordinator.rearm();
        command.await.unwrap();

        // A fresh cycle is pending again.
        assert!(
            timeout(Duration::from_millis(50), coordinator.suspended())
                .await
                .is_err(),
            "suspend latch must be re-armed"
        );
    }

    #[tokio::test]
    async fn test_second_cycle_gets_fresh_latches() {
        let coordinator = SuspendCoordinator::new();

        for _ in 0..2 {
            let command = {
                let c = coordinator.clone();
                tokio::spawn(async move {
                    c.suspended().await;
                    c.notify_resumed();
                })
            };
            coordinator.begin_suspend();
            timeout(Duration::from_secs(1), coordinator.resumed())
                .await
                .expect("cycle must complete");
            coordinator.rearm();
            command.await.unwrap();
        }
    }
}
