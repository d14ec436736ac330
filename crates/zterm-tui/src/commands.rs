//! Console command dispatch.
//!
//! Every branch yields a success-status string (rendered as an informational
//! line in the console output region) or an error (rendered with the red
//! prefix). Anything that is not a built-in runs as a one-shot local shell
//! command.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tracing::warn;

use zterm_core::{dsn, Result, ZtermError};
use zterm_engine::{ssh, Highlight, Job, RemoteClient};

use crate::app::Engine;

const VIEW_USAGE: &str = "missing arguments
usage: view <view-name> <config>

config options:
 hi-word   <word>    - highlight word
 hi-line   <word>    - highlight line which contains word
 hi-remove <word>    - remove highlight for specific word";

/// Dispatch one console line.
pub fn execute(engine: &mut Engine, line: &str) -> Result<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = parts.first() else {
        return Ok(String::new());
    };

    match command {
        "exit" => {
            engine.ui.quit();
            Ok(String::new())
        }
        "help" => {
            engine.toggle_help();
            Ok(String::new())
        }
        "addview" => {
            let name = parts
                .get(1)
                .ok_or_else(|| ZtermError::usage("addview: requires view name to add it"))?;
            engine.add_view(name)?;
            Ok(format!("view '{name}' added"))
        }
        "resize" => {
            let name = parts
                .get(1)
                .ok_or_else(|| ZtermError::usage("resize: requires view name to resize it"))?;
            let delta = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);
            engine.resize_view(name, delta)?;
            Ok(format!("view '{name}' resized"))
        }
        "view" => {
            if parts.len() < 3 {
                return Err(ZtermError::usage(VIEW_USAGE));
            }
            let name = parts[1];
            let option = parts[2];
            let panel = engine
                .panel(name)
                .ok_or_else(|| ZtermError::UnknownView { name: name.into() })?;
            match option {
                "hi-word" | "hi-line" => {
                    let word = parts.get(3).ok_or_else(|| {
                        ZtermError::usage(format!("view: {option} needs a <word> parameter"))
                    })?;
                    let mode = if option == "hi-word" {
                        Highlight::Word
                    } else {
                        Highlight::Line
                    };
                    panel.set_highlight(word.to_string(), mode);
                }
                "hi-remove" => {
                    let word = parts.get(3).ok_or_else(|| {
                        ZtermError::usage(format!("view: {option} needs a <word> parameter"))
                    })?;
                    panel.remove_highlight(word);
                }
                _ => {
                    return Err(ZtermError::usage(format!(
                        "view: config option {option} not implemented"
                    )));
                }
            }
            Ok(format!("view {name} configured"))
        }
        "attach" => {
            if parts.len() < 3 {
                return Err(ZtermError::usage(
                    "missing arguments - usage: attach <view-name> <command>",
                ));
            }
            let name = parts[1];
            engine.attach(name, parts[2..].join(" "))?;
            Ok(format!("command attached to view '{name}'"))
        }
        "remote" => {
            if parts.len() < 2 {
                return Err(ZtermError::usage(
                    "remote: requires command to run on remote server",
                ));
            }
            if engine.remote.is_none() {
                return Err(ZtermError::SshUnavailable);
            }
            engine.run_once(Job::Remote(parts[1..].join(" ")));
            Ok(String::new())
        }
        "vim" => match parts.get(1) {
            Some(_) => {
                let file = line.trim().strip_prefix("vim").unwrap_or("").trim();
                edit_file(engine, file)
            }
            None => {
                engine.run_once(Job::Shell("vim --help".into()));
                Ok(String::new())
            }
        },
        "savecfg" => {
            let path = engine.save_config()?;
            Ok(format!("config file {} updated", path.display()))
        }
        _ => {
            engine.run_once(Job::Shell(line.to_string()));
            Ok(String::new())
        }
    }
}

/// Edit a file in a full-terminal editor through the suspend handshake.
///
/// Dataset names are downloaded into `~/.zterm/tmp/` first and re-uploaded
/// best-effort after the editor exits.
fn edit_file(engine: &mut Engine, file: &str) -> Result<String> {
    let ui = engine.ui.clone();
    let suspend = engine.suspend.clone();

    if dsn::is_dsn(file) {
        let client = engine.remote.clone().ok_or(ZtermError::SshUnavailable)?;
        let file = file.to_string();
        let report = engine.console_out.clone();
        tokio::spawn(async move {
            let local = match download(client.as_ref(), &file).await {
                Ok(path) => path,
                Err(err) => {
                    ui.update(move || report.error(&err));
                    return;
                }
            };

            ui.suspend();
            suspend.suspended().await;
            run_editor(&local.display().to_string()).await;
            suspend.notify_resumed();

            // Re-upload races the UI rebuild; failure is ignored.
            tokio::spawn(async move {
                if let Err(err) = upload(client.as_ref(), &local, &file).await {
                    warn!(%file, error = %err, "dataset re-upload failed");
                }
            });
        });
    } else {
        let file = file.to_string();
        tokio::spawn(async move {
            ui.suspend();
            suspend.suspended().await;
            run_editor(&file).await;
            suspend.notify_resumed();
        });
    }
    Ok(String::new())
}

/// Run the editor on the real terminal. The child's exit is ignored.
async fn run_editor(file: &str) {
    let _ = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(format!("vim {file}"))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await;
}

async fn download(client: &dyn RemoteClient, remote: &str) -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .ok_or_else(|| ZtermError::internal("cannot determine home directory"))?
        .join(".zterm")
        .join("tmp");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ZtermError::io("creating temp directory", &dir, e))?;

    let path = dir.join(dsn::path_base(remote));
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ZtermError::io("creating temp file", &path, e))?;
    ssh::copy_from(client, remote, &mut file).await?;
    file.flush()
        .await
        .map_err(|e| ZtermError::io("flushing temp file", &path, e))?;
    Ok(path)
}

async fn upload(client: &dyn RemoteClient, local: &Path, remote: &str) -> Result<()> {
    let mut file = tokio::fs::File::open(local)
        .await
        .map_err(|e| ZtermError::io("opening temp file", local, e))?;
    ssh::copy_to(client, &mut file, remote).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use zterm_core::Config;
    use zterm_engine::ssh::{RemoteReader, RemoteSession, RemoteWriter};
    use zterm_engine::{Panel, SuspendCoordinator, UiMessage, UiQueue, UiReceiver};

    fn test_engine(remote: Option<Arc<dyn RemoteClient>>) -> (Engine, UiReceiver) {
        let (ui, rx) = UiQueue::new();
        let engine = Engine::new(
            Config::default(),
            remote,
            ui,
            SuspendCoordinator::new(),
            Panel::new("console", i32::MAX, 0, ""),
        );
        (engine, rx)
    }

    #[tokio::test]
    async fn test_addview_then_duplicate() {
        let (mut engine, _rx) = test_engine(None);
        assert_eq!(execute(&mut engine, "addview p3").unwrap(), "view 'p3' added");
        let err = execute(&mut engine, "addview p3").unwrap_err();
        assert!(matches!(err, ZtermError::DuplicateView { .. }));
    }

    #[tokio::test]
    async fn test_addview_requires_name() {
        let (mut engine, _rx) = test_engine(None);
        assert!(matches!(
            execute(&mut engine, "addview"),
            Err(ZtermError::Usage { .. })
        ));
    }

    #[tokio::test]
    async fn test_resize_changes_weight() {
        let (mut engine, _rx) = test_engine(None);
        execute(&mut engine, "addview j1").unwrap();
        execute(&mut engine, "resize j1 3").unwrap();
        assert_eq!(engine.panel("j1").unwrap().size(), 13);
        // Default delta is 1
        execute(&mut engine, "resize j1").unwrap();
        assert_eq!(engine.panel("j1").unwrap().size(), 14);
        // Unknown view is an error
        assert!(matches!(
            execute(&mut engine, "resize nope"),
            Err(ZtermError::UnknownView { .. })
        ));
    }

    #[tokio::test]
    async fn test_view_highlight_commands() {
        let (mut engine, _rx) = test_engine(None);
        execute(&mut engine, "addview j1").unwrap();
        execute(&mut engine, "view j1 hi-word hello").unwrap();
        execute(&mut engine, "view j1 hi-line FATAL").unwrap();

        let panel = engine.panel("j1").unwrap();
        let highlights = panel.highlights();
        assert_eq!(highlights.get("hello"), Some(&Highlight::Word));
        assert_eq!(highlights.get("FATAL"), Some(&Highlight::Line));

        execute(&mut engine, "view j1 hi-remove hello").unwrap();
        assert!(!engine.panel("j1").unwrap().highlights().contains_key("hello"));

        assert!(matches!(
            execute(&mut engine, "view j1 refresh 3"),
            Err(ZtermError::Usage { .. })
        ));
        assert!(matches!(
            execute(&mut engine, "view j1"),
            Err(ZtermError::Usage { .. })
        ));
    }

    #[tokio::test]
    async fn test_view_highlight_applies_to_output() {
        let (mut engine, _rx) = test_engine(None);
        execute(&mut engine, "addview j1").unwrap();
        execute(&mut engine, "view j1 hi-word hello").unwrap();
        let panel = engine.panel("j1").unwrap();
        panel.clear();
        panel.print("well hello there");
        let line = &panel.lines()[0];
        assert!(line.contains("\x1b["), "highlight must wrap in SGR: {line}");
        assert!(line.contains("hello"));
        assert!(line.starts_with("well "), "only the token is wrapped");
    }

    #[tokio::test]
    async fn test_attach_installs_job_and_loop() {
        let (mut engine, _rx) = test_engine(None);
        execute(&mut engine, "addview j1").unwrap();
        let msg = execute(&mut engine, "attach j1 remote uptime").unwrap();
        assert_eq!(msg, "command attached to view 'j1'");
        assert_eq!(
            engine.panel("j1").unwrap().job().as_deref(),
            Some("remote uptime")
        );
        assert!(engine.loops.contains_key("j1"));
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_remote_without_client_is_console_error() {
        let (mut engine, _rx) = test_engine(None);
        assert!(matches!(
            execute(&mut engine, "remote uptime"),
            Err(ZtermError::SshUnavailable)
        ));
        assert!(matches!(
            execute(&mut engine, "remote"),
            Err(ZtermError::Usage { .. })
        ));
    }

    struct MockSession {
        stdout: Option<RemoteReader>,
    }

    #[async_trait::async_trait]
    impl RemoteSession for MockSession {
        fn take_stdin(&mut self) -> Option<RemoteWriter> {
            Some(Box::new(tokio::io::sink()))
        }
        fn take_stdout(&mut self) -> Option<RemoteReader> {
            self.stdout.take()
        }
        fn take_stderr(&mut self) -> Option<RemoteReader> {
            Some(Box::new(tokio::io::empty()))
        }
        async fn wait(&mut self) -> Result<i32> {
            Ok(0)
        }
        fn close(&mut self) {}
    }

    struct MockRemote;

    #[async_trait::async_trait]
    impl RemoteClient for MockRemote {
        async fn open_shell(&self) -> Result<Box<dyn RemoteSession>> {
            Ok(Box::new(MockSession {
                stdout: Some(Box::new(std::io::Cursor::new(b"up 3 days\n".to_vec()))),
            }))
        }
        async fn exec(&self, _command: &str) -> Result<Box<dyn RemoteSession>> {
            self.open_shell().await
        }
    }

    #[tokio::test]
    async fn test_remote_one_shot_surfaces_in_output_floaty() {
        let (mut engine, mut rx) = test_engine(Some(Arc::new(MockRemote)));
        execute(&mut engine, "remote uptime").unwrap();

        let panel = engine.floaties.last().unwrap().panel.clone();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            while let Some(msg) = rx.try_next() {
                if let UiMessage::Update(f) = msg {
                    f();
                }
            }
            if panel.lines().iter().any(|l| l.contains("up 3 days")) {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "no remote output");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_exit_posts_quit() {
        let (mut engine, mut rx) = test_engine(None);
        execute(&mut engine, "exit").unwrap();
        assert!(matches!(rx.try_next(), Some(UiMessage::Quit)));
    }

    #[tokio::test]
    async fn test_savecfg_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".zterm.yml");
        let (mut engine, _rx) = test_engine(None);
        engine.config.set_path(path.clone());
        execute(&mut engine, "addview j1").unwrap();
        let msg = execute(&mut engine, "savecfg").unwrap();
        assert!(msg.contains(".zterm.yml"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_vim_on_dataset_without_ssh_fails() {
        let (mut engine, _rx) = test_engine(None);
        assert!(matches!(
            execute(&mut engine, "vim //'SYS1.PARMLIB(MEMBER)'"),
            Err(ZtermError::SshUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_unknown_command_runs_as_shell() {
        let (mut engine, mut rx) = test_engine(None);
        execute(&mut engine, "echo fallback").unwrap();

        let panel = engine.floaties.last().unwrap().panel.clone();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            while let Some(msg) = rx.try_next() {
                if let UiMessage::Update(f) = msg {
                    f();
                }
            }
            if panel.lines().iter().any(|l| l.contains("fallback")) {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "no shell output");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        engine.shutdown();
    }
}
