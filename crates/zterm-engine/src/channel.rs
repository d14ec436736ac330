//! Producer-to-consumer stream carrying output lines plus one terminal error.
//!
//! A [`Channel`] is created per producer run. The producer side holds a
//! [`ChannelSink`] and pushes lines into a bounded queue; the consumer side
//! (the renderer bridge) drains the queue. Shutdown is two-phase: any party
//! may close the `stop` latch (the request to end), after which the producer
//! stops sending and the consumer drains what is left.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use zterm_core::ZtermError;

use crate::latch::Latch;

/// Bounded capacity of the line queue.
pub const OUT_CAPACITY: usize = 10;

/// Result of a send attempt against a possibly-stopped channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The value was handed to the consumer side.
    Delivered,
    /// The stop latch closed (or the consumer went away) before the value
    /// could be queued; nothing was sent.
    Aborted,
}

struct ChannelShared {
    stop: Latch,
    out_rx: Mutex<Option<mpsc::Receiver<String>>>,
    err_rx: Mutex<Option<mpsc::Receiver<ZtermError>>>,
}

/// Shared consumer-side handle to one producer run.
///
/// Cheap to clone; the panel, the refresh loop and the renderer bridge all
/// hold one.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelShared>,
}

impl Channel {
    /// Create a channel and the producer-side sink writing into it.
    pub fn new() -> (Channel, ChannelSink) {
        let (out_tx, out_rx) = mpsc::channel(OUT_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel(1);
        let stop = Latch::new();
        let channel = Channel {
            inner: Arc::new(ChannelShared {
                stop: stop.clone(),
                out_rx: Mutex::new(Some(out_rx)),
                err_rx: Mutex::new(Some(err_rx)),
            }),
        };
        let sink = ChannelSink {
            out: Some(out_tx),
            err: Some(err_tx),
            stop,
        };
        (channel, sink)
    }

    /// Request the stream's end. Idempotent and safe under concurrent calls
    /// from any task.
    pub fn stop(&self) {
        self.inner.stop.close();
    }

    /// Whether the stream's end has been requested.
    pub fn is_stopped(&self) -> bool {
        self.inner.stop.is_closed()
    }

    /// Wait handle that becomes ready once the stream's end is declared.
    pub async fn ended(&self) {
        self.inner.stop.closed().await
    }

    /// The stop latch, for producers that need to tie child cancellation to
    /// this channel.
    pub fn stop_latch(&self) -> Latch {
        self.inner.stop.clone()
    }

    /// Take the line receiver. Only the first caller gets it; the renderer
    /// bridge owns the drain.
    pub fn take_output(&self) -> Option<mpsc::Receiver<String>> {
        self.inner.out_rx.lock().ok()?.take()
    }

    /// Take the terminal-error receiver (carries at most one value).
    pub fn take_errors(&self) -> Option<mpsc::Receiver<ZtermError>> {
        self.inner.err_rx.lock().ok()?.take()
    }

    /// Whether two handles refer to the same producer run.
    pub fn same_run(&self, other: &Channel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Producer-side half of a [`Channel`].
///
/// Dropping the sink closes both queues, declaring that no further lines and
/// no terminal error are forthcoming.
pub struct ChannelSink {
    out: Option<mpsc::Sender<String>>,
    err: Option<mpsc::Sender<ZtermError>>,
    stop: Latch,
}

impl ChannelSink {
    /// Queue one output line, suspending while the queue is full. Aborts
    /// without sending as soon as the stop latch closes.
    pub async fn send_line(&self, line: String) -> SendOutcome {
        let Some(out) = self.out.as_ref() else {
            return SendOutcome::Aborted;
        };
        tokio::select! {
            // Stop wins over a ready queue slot so that no send succeeds
            // after the stream's end was requested.
            biased;
            _ = self.stop.closed() => SendOutcome::Aborted,
            res = out.send(line) => match res {
                Ok(()) => SendOutcome::Delivered,
                Err(_) => SendOutcome::Aborted,
            },
        }
    }

    /// Queue the single terminal error. Same stop semantics as
    /// [`send_line`](Self::send_line).
    pub async fn send_err(&self, err: ZtermError) -> SendOutcome {
        let Some(err_tx) = self.err.as_ref() else {
            return SendOutcome::Aborted;
        };
        tokio::select! {
            biased;
            _ = self.stop.closed() => SendOutcome::Aborted,
            res = err_tx.send(err) => match res {
                Ok(()) => SendOutcome::Delivered,
                Err(_) => SendOutcome::Aborted,
            },
        }
    }

    /// Declare that no further lines will be sent.
    pub fn close_out(&mut self) {
        self.out = None;
    }

    /// Declare that no terminal error is forthcoming.
    pub fn close_err(&mut self) {
        self.err = None;
    }

    /// The stop latch, for select loops and child cancellation.
    pub fn stop_latch(&self) -> Latch {
        self.stop.clone()
    }

    /// Whether the stream's end has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_lines_delivered_in_order() {
        let (channel, sink) = Channel::new();
        let mut rx = channel.take_output().unwrap();

        for i in 0..5 {
            assert_eq!(sink.send_line(format!("line {i}")).await, SendOutcome::Delivered);
        }
        drop(sink);

        for i in 0..5 {
            assert_eq!(rx.recv().await.unwrap(), format!("line {i}"));
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_concurrent() {
        let (channel, _sink) = Channel::new();
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let c = channel.clone();
            tasks.push(tokio::spawn(async move {
                c.stop();
                c.stop();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert!(channel.is_stopped());
        timeout(Duration::from_millis(100), channel.ended())
            .await
            .expect("ended after stop");
    }

    #[tokio::test]
    async fn test_no_send_succeeds_after_stop() {
        let (channel, sink) = Channel::new();
        channel.stop();
        assert_eq!(sink.send_line("late".into()).await, SendOutcome::Aborted);
        assert_eq!(
            sink.send_err(ZtermError::CommandFailed { status: 1 }).await,
            SendOutcome::Aborted
        );
    }

    #[tokio::test]
    async fn test_saturated_send_unblocks_on_stop() {
        let (channel, sink) = Channel::new();
        // Fill the queue; no consumer is draining.
        for i in 0..OUT_CAPACITY {
            assert_eq!(sink.send_line(format!("{i}")).await, SendOutcome::Delivered);
        }

        let pending = {
            let c = channel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                c.stop();
            });
            sink.send_line("overflow".into())
        };
        let outcome = timeout(Duration::from_secs(1), pending)
            .await
            .expect("send must unblock once stop closes");
        assert_eq!(outcome, SendOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_err_carries_at_most_one_value() {
        let (channel, mut sink) = Channel::new();
        assert_eq!(
            sink.send_err(ZtermError::CommandFailed { status: 2 }).await,
            SendOutcome::Delivered
        );
        sink.close_err();

        let mut errs = channel.take_errors().unwrap();
        assert!(matches!(
            errs.recv().await,
            Some(ZtermError::CommandFailed { status: 2 })
        ));
        assert!(errs.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_out_ends_stream() {
        let (channel, mut sink) = Channel::new();
        sink.send_line("only".into()).await;
        sink.close_out();
        assert_eq!(sink.send_line("late".into()).await, SendOutcome::Aborted);

        let mut rx = channel.take_output().unwrap();
        assert_eq!(rx.recv().await.unwrap(), "only");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receivers_taken_once() {
        let (channel, _sink) = Channel::new();
        assert!(channel.take_output().is_some());
        assert!(channel.take_output().is_none());
        assert!(channel.take_errors().is_some());
        assert!(channel.take_errors().is_none());
    }
}
