//! Renderer bridge: the per-channel consumer.
//!
//! Reads a channel's line queue, coalesces lines into ~60 Hz batches and
//! hands them to the panel through the UI queue; panels are never written
//! directly from here. The first flush of a run clears the panel so that
//! snapshot-style refreshes visually replace the previous content; later
//! flushes append. After the line queue closes, the single terminal error
//! (if any) is forwarded, then the channel's remaining latches collapse.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::channel::Channel;
use crate::panel::Panel;
use crate::queue::UiQueue;
use crate::suspend::SuspendCoordinator;

/// Batch flush cadence (~60 Hz).
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(16);

/// Start the bridge task for one channel.
pub fn spawn_bridge(
    panel: Panel,
    channel: Channel,
    ui: UiQueue,
    suspend: SuspendCoordinator,
) -> JoinHandle<()> {
    tokio::spawn(run_bridge(panel, channel, ui, suspend))
}

async fn run_bridge(panel: Panel, channel: Channel, ui: UiQueue, suspend: SuspendCoordinator) {
    let Some(mut out) = channel.take_output() else {
        // Someone else owns the drain; nothing to bridge.
        channel.stop();
        return;
    };

    let mut pending = String::new();
    let mut first = true;
    let mut tick = tokio::time::interval(FLUSH_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = suspend.suspended() => {
                // The terminal is gone; hold writes until it is rebuilt.
                suspend.resumed().await;
            }
            recv = out.recv() => match recv {
                Some(line) => {
                    pending.push_str(&line);
                    pending.push('\n');
                }
                None => break,
            },
            _ = tick.tick() => {
                flush(&panel, &ui, &mut pending, &mut first);
            }
        }
    }
    flush(&panel, &ui, &mut pending, &mut first);

    // out is fully drained; at most one terminal error follows.
    if let Some(mut errs) = channel.take_errors() {
        while let Some(err) = errs.recv().await {
            let p = panel.clone();
            ui.update(move || p.error(&err));
        }
    }

    channel.stop();
}

fn flush(panel: &Panel, ui: &UiQueue, pending: &mut String, first: &mut bool) {
    if pending.trim().is_empty() {
        return;
    }
    let batch = std::mem::take(pending);
    let p = panel.clone();
    if *first {
        *first = false;
        ui.update(move || {
            if !p.is_hidden() {
                p.clear();
                p.print(&batch);
            }
        });
    } else {
        ui.update(move || {
            if !p.is_hidden() {
                p.print(&batch);
            }
        });
    }
}
