//! SSH transport.
//!
//! The engine talks to the remote side through the [`RemoteClient`] trait: a
//! multiplexed client that can open any number of concurrent sessions, each
//! with independent stdin/stdout/stderr and a wait-for-exit primitive.
//!
//! The production implementation, [`OpenSsh`], drives the system `ssh`
//! binary with ControlMaster multiplexing: one master connection is
//! established at startup and every session is a mux'd child process. Key
//! handling, known-hosts checking and agent support all stay with OpenSSH.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use zterm_core::{dsn, Result, ZtermError};

/// Read half of a session pipe.
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;
/// Write half of a session pipe.
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One running command (or shell) on the remote side.
#[async_trait]
pub trait RemoteSession: Send {
    /// Take the session's stdin. Only the first caller gets it.
    fn take_stdin(&mut self) -> Option<RemoteWriter>;
    /// Take the session's stdout.
    fn take_stdout(&mut self) -> Option<RemoteReader>;
    /// Take the session's stderr.
    fn take_stderr(&mut self) -> Option<RemoteReader>;
    /// Wait for the session to end and return its exit code.
    async fn wait(&mut self) -> Result<i32>;
    /// Tear the session down, unblocking any reader. Idempotent.
    fn close(&mut self);
}

/// Multiplexed client able to open independent concurrent sessions.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Open a session running a login shell that reads commands from stdin.
    async fn open_shell(&self) -> Result<Box<dyn RemoteSession>>;
    /// Open a session running a single command.
    async fn exec(&self, command: &str) -> Result<Box<dyn RemoteSession>>;
}

/// [`RemoteClient`] over the system `ssh` binary.
pub struct OpenSsh {
    target: String,
    control_path: PathBuf,
}

impl OpenSsh {
    /// Establish the master connection to `host`.
    ///
    /// Runs in batch mode: authentication must work non-interactively (key
    /// or agent). A failure to connect is reported with ssh's own stderr.
    pub async fn connect(host: &str, user: Option<&str>) -> Result<OpenSsh> {
        let dir = dirs::home_dir()
            .ok_or_else(|| ZtermError::internal("cannot determine home directory"))?
            .join(".zterm");
        std::fs::create_dir_all(&dir).map_err(|e| ZtermError::io("creating control directory", &dir, e))?;

        let control_path = dir.join(format!("ctl-{}-{}", host, std::process::id()));
        let target = match user {
            Some(user) if !user.is_empty() => format!("{user}@{host}"),
            _ => host.to_string(),
        };

        let client = OpenSsh {
            target,
            control_path,
        };

        let output = client
            .command()
            .args(["-o", "ControlMaster=yes", "-o", "ControlPersist=600", "-N", "-f"])
            .arg(&client.target)
            .output()
            .await
            .map_err(|e| ZtermError::spawn("ssh", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ZtermError::SshConnect {
                host: host.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        debug!(target = %client.target, "ssh master connection established");
        Ok(client)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .args(["-o", "BatchMode=yes"]);
        cmd
    }

    fn spawn_session(&self, extra: &[&str]) -> Result<Box<dyn RemoteSession>> {
        let mut cmd = self.command();
        cmd.args(["-o", "ControlMaster=no", "-T"])
            .arg(&self.target)
            .args(extra)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = cmd.spawn().map_err(|e| ZtermError::SshSession {
            message: e.to_string(),
        })?;
        Ok(Box::new(SshSession { child }))
    }

    /// Tear down the master connection.
    pub async fn close(&self) {
        let result = self
            .command()
            .args(["-O", "exit"])
            .arg(&self.target)
            .output()
            .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to stop ssh master");
        }
    }
}

#[async_trait]
impl RemoteClient for OpenSsh {
    async fn open_shell(&self) -> Result<Box<dyn RemoteSession>> {
        self.spawn_session(&[])
    }

    async fn exec(&self, command: &str) -> Result<Box<dyn RemoteSession>> {
        self.spawn_session(&["--", command])
    }
}

struct SshSession {
    child: Child,
}

#[async_trait]
impl RemoteSession for SshSession {
    fn take_stdin(&mut self) -> Option<RemoteWriter> {
        self.child.stdin.take().map(|s| Box::new(s) as RemoteWriter)
    }

    fn take_stdout(&mut self) -> Option<RemoteReader> {
        self.child.stdout.take().map(|s| Box::new(s) as RemoteReader)
    }

    fn take_stderr(&mut self) -> Option<RemoteReader> {
        self.child.stderr.take().map(|s| Box::new(s) as RemoteReader)
    }

    async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await.map_err(|e| ZtermError::SshSession {
            message: e.to_string(),
        })?;
        Ok(status.code().unwrap_or(-1))
    }

    fn close(&mut self) {
        // Killing the mux'd child closes the session and unblocks readers.
        let _ = self.child.start_kill();
    }
}

/// Stream a remote file (or dataset) into `dest`.
pub async fn copy_from<W>(client: &dyn RemoteClient, remote: &str, dest: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let command = if dsn::is_dsn(remote) {
        let norm = dsn::normalize(remote);
        let base = dsn::path_base(remote);
        format!("cp {norm} ~/.zterm/{base} && cat ~/.zterm/{base}")
    } else {
        format!("cat {remote}")
    };

    let mut session = client.exec(&command).await?;
    let mut stdout = session.take_stdout().ok_or_else(|| ZtermError::SshSession {
        message: "session stdout unavailable".into(),
    })?;
    tokio::io::copy(&mut stdout, dest)
        .await
        .map_err(|e| ZtermError::io("copying from remote", remote, e))?;

    let code = session.wait().await?;
    if code != 0 {
        return Err(ZtermError::SshExit { code });
    }
    Ok(())
}

/// Stream `src` into a remote file (or dataset).
pub async fn copy_to<R>(client: &dyn RemoteClient, src: &mut R, remote: &str) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let command = if dsn::is_dsn(remote) {
        let norm = dsn::normalize(remote);
        let base = dsn::path_base(remote);
        format!("cat > ~/.zterm/{base} && cp ~/.zterm/{base} {norm}")
    } else {
        format!("cat > {remote}")
    };

    let mut session = client.exec(&command).await?;
    let mut stdin = session.take_stdin().ok_or_else(|| ZtermError::SshSession {
        message: "session stdin unavailable".into(),
    })?;
    tokio::io::copy(src, &mut stdin)
        .await
        .map_err(|e| ZtermError::io("copying to remote", remote, e))?;
    stdin
        .shutdown()
        .await
        .map_err(|e| ZtermError::io("closing remote stdin", remote, e))?;
    drop(stdin);

    let code = session.wait().await?;
    if code != 0 {
        return Err(ZtermError::SshExit { code });
    }
    Ok(())
}
