//! Refresh loop: the per-panel supervisor.
//!
//! Ties a producer recipe to a panel. Each generation creates a fresh
//! channel, starts the producer and the renderer bridge, waits for the
//! stream's end, sleeps for the interval and repeats. Generation N+1 never
//! starts while generation N's channel is live, and the loop is cancellable
//! at every wait point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::bridge::spawn_bridge;
use crate::channel::Channel;
use crate::panel::Panel;
use crate::producer::{spawn_job, Job};
use crate::queue::UiQueue;
use crate::ssh::RemoteClient;
use crate::suspend::SuspendCoordinator;

/// The interval cycle stepped through by the refresh keybinding.
pub const REFRESH_INTERVALS: [Duration; 3] = [
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
];

/// Next interval in the `2s -> 5s -> 10s -> 2s` cycle. Unknown values reset
/// to the start of the cycle.
pub fn next_interval(current: Duration) -> Duration {
    match REFRESH_INTERVALS.iter().position(|i| *i == current) {
        Some(idx) => REFRESH_INTERVALS[(idx + 1) % REFRESH_INTERVALS.len()],
        None => REFRESH_INTERVALS[0],
    }
}

/// Handle to one running refresh loop.
pub struct RefreshLoop {
    stop_tx: mpsc::Sender<()>,
    interval: Duration,
    handle: JoinHandle<()>,
}

impl RefreshLoop {
    /// Start the loop. Returns immediately; the first generation is already
    /// on its way.
    pub fn spawn(
        panel: Panel,
        job: Job,
        interval: Duration,
        remote: Option<Arc<dyn RemoteClient>>,
        ui: UiQueue,
        suspend: SuspendCoordinator,
    ) -> RefreshLoop {
        // One-slot stop ring: redundant stops are dropped, the first wins.
        let (stop_tx, stop_rx) = mpsc::channel(1);
        debug!(panel = panel.name(), ?interval, "refresh loop started");
        let handle = tokio::spawn(run_loop(panel, job, interval, remote, ui, suspend, stop_rx));
        RefreshLoop {
            stop_tx,
            interval,
            handle,
        }
    }

    /// Unblock the loop from whichever wait it is in. Safe to call more than
    /// once.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    panel: Panel,
    job: Job,
    interval: Duration,
    remote: Option<Arc<dyn RemoteClient>>,
    ui: UiQueue,
    suspend: SuspendCoordinator,
    mut stop_rx: mpsc::Receiver<()>,
) {
    loop {
        let (channel, sink) = Channel::new();
        spawn_job(&job, remote.clone(), sink);
        panel.connect(channel.clone());
        spawn_bridge(panel.clone(), channel.clone(), ui.clone(), suspend.clone());

        tokio::select! {
            _ = channel.ended() => {}
            _ = stop_rx.recv() => {
                channel.stop();
                debug!(panel = panel.name(), "refresh loop stopped mid-generation");
                return;
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop_rx.recv() => {
                debug!(panel = panel.name(), "refresh loop stopped in sleep phase");
                return;
            }
        }
    }
}
