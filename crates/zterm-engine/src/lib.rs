//! # zterm-engine
//!
//! The panel execution engine behind the zterm dashboard: the concurrent
//! substrate that launches producers, streams their output into panels with
//! bounded buffering and timer-driven coalescing, enforces cancellation
//! across nested owners and re-runs producers on a per-panel refresh loop.
//!
//! Components, leaves first:
//! - [`channel`] - a bounded, cancellable stream of lines plus one terminal
//!   error, with two-phase shutdown
//! - [`producer`] - local shell and remote session producers feeding a
//!   channel
//! - [`ssh`] - the multiplexed remote client the remote producer runs on
//! - [`panel`] - addressable output sinks with highlight rules and a
//!   bounded scroll buffer
//! - [`refresh`] - the per-panel supervisor re-running a producer on an
//!   interval
//! - [`bridge`] - the per-channel consumer batching lines into the UI queue
//! - [`queue`] - the single-threaded UI update queue
//! - [`suspend`] - the suspend/resume handshake handing the real terminal
//!   to an interactive child

pub mod bridge;
pub mod channel;
pub mod latch;
pub mod panel;
pub mod producer;
pub mod queue;
pub mod refresh;
mod scan;
pub mod ssh;
pub mod suspend;

pub use bridge::spawn_bridge;
pub use channel::{Channel, ChannelSink, SendOutcome};
pub use latch::Latch;
pub use panel::{Highlight, Panel};
pub use producer::{spawn_job, spawn_remote, spawn_shell, Job};
pub use queue::{UiMessage, UiQueue, UiReceiver};
pub use refresh::{next_interval, RefreshLoop, REFRESH_INTERVALS};
pub use ssh::{OpenSsh, RemoteClient, RemoteSession};
pub use suspend::SuspendCoordinator;
