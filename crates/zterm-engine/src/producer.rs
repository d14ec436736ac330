//! Producers: tasks that run an external command and pipe its output into a
//! [`Channel`](crate::channel::Channel).
//!
//! Two producers share one contract: given a command string and a channel
//! sink, spawn, stream merged stdout+stderr as lines, and terminate the
//! channel on exit or cancellation. The local producer runs `sh -c`; the
//! remote producer runs the command through a session on the shared SSH
//! client.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use zterm_core::ZtermError;

use crate::channel::{ChannelSink, SendOutcome};
use crate::latch::Latch;
use crate::scan::LineScanner;
use crate::ssh::RemoteClient;

/// Parsed panel job: what to run and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Run under the local shell.
    Shell(String),
    /// Run on the remote side (the `remote ` command prefix).
    Remote(String),
}

impl Job {
    /// Classify a job string. The `remote ` prefix selects the SSH producer;
    /// everything else is a local shell command.
    pub fn parse(raw: &str) -> Job {
        let raw = raw.trim();
        if raw == "remote" {
            return Job::Remote(String::new());
        }
        match raw.strip_prefix("remote ") {
            Some(rest) => Job::Remote(rest.trim().to_string()),
            None => Job::Shell(raw.to_string()),
        }
    }

    /// The command to execute, without the producer prefix.
    pub fn command(&self) -> &str {
        match self {
            Job::Shell(cmd) | Job::Remote(cmd) => cmd,
        }
    }

    /// Whether this job runs through the SSH client.
    pub fn is_remote(&self) -> bool {
        matches!(self, Job::Remote(_))
    }
}

/// Start the local shell producer. Returns immediately; the task owns the
/// child until exit or cancellation.
pub fn spawn_shell(command: String, sink: ChannelSink) -> JoinHandle<()> {
    tokio::spawn(run_shell(command, sink))
}

/// Start the remote session producer. Requires an initialised SSH client;
/// without one the channel carries an [`ZtermError::SshUnavailable`] error.
pub fn spawn_remote(
    client: Option<Arc<dyn RemoteClient>>,
    command: String,
    sink: ChannelSink,
) -> JoinHandle<()> {
    tokio::spawn(run_remote(client, command, sink))
}

/// Start the producer matching a parsed [`Job`].
pub fn spawn_job(job: &Job, client: Option<Arc<dyn RemoteClient>>, sink: ChannelSink) -> JoinHandle<()> {
    match job {
        Job::Shell(cmd) => spawn_shell(cmd.clone(), sink),
        Job::Remote(cmd) => spawn_remote(client, cmd.clone(), sink),
    }
}

#[instrument(level = "debug", skip(sink))]
async fn run_shell(command: String, sink: ChannelSink) {
    // An empty command is an empty stream with a successful exit.
    if command.trim().is_empty() {
        return;
    }

    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(&command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            sink.send_err(ZtermError::spawn(&command, e)).await;
            return;
        }
    };

    let stop = sink.stop_latch();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    if !scan_into(stdout, stderr, &sink, &stop).await {
        kill(&mut child).await;
        return;
    }

    let status = tokio::select! {
        biased;
        _ = stop.closed() => {
            kill(&mut child).await;
            return;
        }
        status = child.wait() => status,
    };
    match status {
        Ok(status) if !status.success() => {
            let code = status.code().unwrap_or(-1);
            debug!(%command, code, "command failed");
            sink.send_err(ZtermError::CommandFailed { status: code }).await;
        }
        Err(e) => {
            sink.send_err(ZtermError::io("waiting for child", "sh", e)).await;
        }
        _ => {}
    }
}

#[instrument(level = "debug", skip(client, sink))]
async fn run_remote(client: Option<Arc<dyn RemoteClient>>, command: String, sink: ChannelSink) {
    let Some(client) = client else {
        sink.send_err(ZtermError::SshUnavailable).await;
        return;
    };
    if command.trim().is_empty() {
        return;
    }

    let mut session = match client.open_shell().await {
        Ok(session) => session,
        Err(e) => {
            sink.send_err(e).await;
            return;
        }
    };

    // One command per session: write it, then EOF forces the shell out.
    if let Some(mut stdin) = session.take_stdin() {
        let payload = format!("{command}\n");
        let sent = stdin.write_all(payload.as_bytes()).await;
        let closed = stdin.shutdown().await;
        drop(stdin);
        if sent.is_err() || closed.is_err() {
            session.close();
            let _ = session.wait().await;
            sink.send_err(ZtermError::SshSession {
                message: "cannot send command".into(),
            })
            .await;
            return;
        }
    }

    let stop = sink.stop_latch();
    let stdout = session.take_stdout();
    let stderr = session.take_stderr();
    if !scan_into(stdout, stderr, &sink, &stop).await {
        session.close();
        let _ = session.wait().await;
        return;
    }

    let code = tokio::select! {
        biased;
        _ = stop.closed() => {
            session.close();
            let _ = session.wait().await;
            return;
        }
        code = session.wait() => code,
    };
    match code {
        Ok(code) if code != 0 => {
            debug!(%command, code, "remote command failed");
            sink.send_err(ZtermError::SshExit { code }).await;
        }
        Err(e) => {
            sink.send_err(e).await;
        }
        _ => {}
    }
}

/// Scan both pipes to EOF, forwarding lines into the sink. Returns false
/// when the stop latch closed (or the consumer vanished) mid-stream.
async fn scan_into<O, E>(
    stdout: Option<O>,
    stderr: Option<E>,
    sink: &ChannelSink,
    stop: &Latch,
) -> bool
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = stdout.map(LineScanner::new);
    let mut err = stderr.map(LineScanner::new);
    let mut out_done = out.is_none();
    let mut err_done = err.is_none();

    while !(out_done && err_done) {
        tokio::select! {
            biased;
            _ = stop.closed() => return false,
            line = next_from(&mut out), if !out_done => match line {
                Some(line) => {
                    if sink.send_line(line).await == SendOutcome::Aborted {
                        return false;
                    }
                }
                None => out_done = true,
            },
            line = next_from(&mut err), if !err_done => match line {
                Some(line) => {
                    if sink.send_line(line).await == SendOutcome::Aborted {
                        return false;
                    }
                }
                None => err_done = true,
            },
        }
    }
    true
}

async fn next_from<R: AsyncRead + Unpin>(scanner: &mut Option<LineScanner<R>>) -> Option<String> {
    match scanner {
        Some(scanner) => scanner.next_line().await,
        None => None,
    }
}

async fn kill(child: &mut Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::ssh::{RemoteReader, RemoteSession, RemoteWriter};
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::time::timeout;
    use zterm_core::Result;

    async fn collect(channel: &Channel) -> (Vec<String>, Vec<ZtermError>) {
        let mut lines = Vec::new();
        let mut rx = channel.take_output().unwrap();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        let mut errs = Vec::new();
        let mut err_rx = channel.take_errors().unwrap();
        while let Some(err) = err_rx.recv().await {
            errs.push(err);
        }
        (lines, errs)
    }

    #[test]
    fn test_job_parse() {
        assert_eq!(Job::parse("echo hi"), Job::Shell("echo hi".into()));
        assert_eq!(Job::parse("remote uptime"), Job::Remote("uptime".into()));
        assert_eq!(Job::parse("  remote  zsyslog "), Job::Remote("zsyslog".into()));
        assert_eq!(Job::parse("remote"), Job::Remote(String::new()));
        // Only the word prefix selects the remote producer
        assert_eq!(Job::parse("remotectl status"), Job::Shell("remotectl status".into()));
    }

    #[tokio::test]
    async fn test_shell_single_line() {
        let (channel, sink) = Channel::new();
        spawn_shell("echo hello".into(), sink);
        let (lines, errs) = collect(&channel).await;
        assert_eq!(lines, vec!["hello"]);
        assert!(errs.is_empty());
    }

    #[tokio::test]
    async fn test_shell_merges_stderr() {
        let (channel, sink) = Channel::new();
        spawn_shell("echo out; echo err 1>&2".into(), sink);
        let (mut lines, errs) = collect(&channel).await;
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
        assert!(errs.is_empty());
    }

    #[tokio::test]
    async fn test_shell_nonzero_exit_reported() {
        let (channel, sink) = Channel::new();
        spawn_shell("exit 3".into(), sink);
        let (lines, errs) = collect(&channel).await;
        assert!(lines.is_empty());
        assert!(matches!(errs.as_slice(), [ZtermError::CommandFailed { status: 3 }]));
    }

    #[tokio::test]
    async fn test_shell_line_without_trailing_newline() {
        let (channel, sink) = Channel::new();
        spawn_shell("printf tail".into(), sink);
        let (lines, _) = collect(&channel).await;
        assert_eq!(lines, vec!["tail"]);
    }

    #[tokio::test]
    async fn test_shell_empty_command_is_empty_success() {
        let (channel, sink) = Channel::new();
        let handle = spawn_shell("   ".into(), sink);
        handle.await.unwrap();
        let (lines, errs) = collect(&channel).await;
        assert!(lines.is_empty());
        assert!(errs.is_empty());
    }

    #[tokio::test]
    async fn test_shell_cancellation_kills_child() {
        let (channel, sink) = Channel::new();
        let handle = spawn_shell("sleep 5".into(), sink);
        tokio::time::sleep(Duration::from_millis(50)).await;
        channel.stop();
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("producer must exit promptly after stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shell_no_writes_after_done() {
        let (channel, sink) = Channel::new();
        let handle = spawn_shell("echo once".into(), sink);
        handle.await.unwrap();
        // Producer is gone; both queues must be closed.
        let (lines, errs) = collect(&channel).await;
        assert_eq!(lines, vec!["once"]);
        assert!(errs.is_empty());
    }

    struct MockSession {
        stdin: Option<RemoteWriter>,
        stdout: Option<RemoteReader>,
        stderr: Option<RemoteReader>,
        exit: i32,
    }

    #[async_trait]
    impl RemoteSession for MockSession {
        fn take_stdin(&mut self) -> Option<RemoteWriter> {
            self.stdin.take()
        }
        fn take_stdout(&mut self) -> Option<RemoteReader> {
            self.stdout.take()
        }
        fn take_stderr(&mut self) -> Option<RemoteReader> {
            self.stderr.take()
        }
        async fn wait(&mut self) -> Result<i32> {
            Ok(self.exit)
        }
        fn close(&mut self) {}
    }

    struct MockRemote {
        output: String,
        exit: i32,
    }

    #[async_trait]
    impl RemoteClient for MockRemote {
        async fn open_shell(&self) -> Result<Box<dyn RemoteSession>> {
            Ok(Box::new(MockSession {
                stdin: Some(Box::new(tokio::io::sink())),
                stdout: Some(Box::new(Cursor::new(self.output.clone().into_bytes()))),
                stderr: Some(Box::new(tokio::io::empty())),
                exit: self.exit,
            }))
        }
        async fn exec(&self, _command: &str) -> Result<Box<dyn RemoteSession>> {
            self.open_shell().await
        }
    }

    #[tokio::test]
    async fn test_remote_streams_output() {
        let client: Arc<dyn RemoteClient> = Arc::new(MockRemote {
            output: "up 3 days\n".into(),
            exit: 0,
        });
        let (channel, sink) = Channel::new();
        spawn_remote(Some(client), "uptime".into(), sink);
        let (lines, errs) = collect(&channel).await;
        assert_eq!(lines, vec!["up 3 days"]);
        assert!(errs.is_empty());
    }

    #[tokio::test]
    async fn test_remote_exit_code_mapped() {
        let client: Arc<dyn RemoteClient> = Arc::new(MockRemote {
            output: String::new(),
            exit: 7,
        });
        let (channel, sink) = Channel::new();
        spawn_remote(Some(client), "false".into(), sink);
        let (_, errs) = collect(&channel).await;
        assert!(matches!(errs.as_slice(), [ZtermError::SshExit { code: 7 }]));
    }

    #[tokio::test]
    async fn test_remote_without_client_errors() {
        let (channel, sink) = Channel::new();
        spawn_remote(None, "uptime".into(), sink);
        let (lines, errs) = collect(&channel).await;
        assert!(lines.is_empty());
        assert!(matches!(errs.as_slice(), [ZtermError::SshUnavailable]));
    }
}
