//! zterm - terminal dashboard for long-running data feeds.
//!
//! Hosts several panels side by side, each re-running a local or remote
//! command on a timer and streaming its output into a bounded scroll buffer.
//! A console prompt attaches commands to panels, resizes them, edits remote
//! files and writes the configuration back.
//!
//! ## Usage
//!
//! ```bash
//! # Local-only dashboard with ./.zterm.yml or ~/.zterm.yml
//! zterm --no-remote
//!
//! # Connect the shared SSH client to the host from the config
//! zterm
//!
//! # Override the endpoint and refresh interval
//! zterm --user ibmuser --refresh-interval 10 zos.example.com
//! ```

use std::panic;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use zterm_core::{init_logging, Config};
use zterm_engine::{OpenSsh, RemoteClient};
use zterm_tui::App;

/// Terminal dashboard streaming local and remote command output into
/// refreshing panels.
#[derive(Parser, Debug)]
#[command(name = "zterm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default is ./.zterm.yml or ~/.zterm.yml)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Do not connect the SSH client; remote jobs will report an error
    #[arg(long)]
    no_remote: bool,

    /// User name used to connect to the remote server
    #[arg(long)]
    user: Option<String>,

    /// Refresh interval in seconds used for panels at startup
    #[arg(short = 'r', long)]
    refresh_interval: Option<u64>,

    /// Host name of the remote server (overrides the config)
    host: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(None, cli.debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::from(1);
        }
    };

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "cannot load config");
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(user) = &cli.user {
        config.server.user = user.clone();
    }
    if let Some(refresh) = cli.refresh_interval {
        config.server.refresh = refresh;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    // Connect the shared SSH client before the terminal is taken over, so
    // ssh can still report auth problems on the real terminal.
    let remote: Option<Arc<dyn RemoteClient>> = if cli.no_remote || config.server.host.is_empty() {
        None
    } else {
        let host = config.server.host.clone();
        let user = config.server.user.clone();
        let user = (!user.is_empty()).then_some(user);
        match runtime.block_on(OpenSsh::connect(&host, user.as_deref())) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                // The dashboard still works locally; remote jobs surface
                // the missing client as panel errors.
                eprintln!("{e}");
                None
            }
        }
    };

    install_panic_hook();
    info!(host = %config.server.host, views = config.views.len(), "starting zterm");

    let (mut app, ui_rx) = App::new(config, remote);
    match runtime.block_on(app.run(ui_rx)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "dashboard error");
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Restore the terminal before printing a panic, so the message is readable
/// and the shell stays usable.
fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        );
        original_hook(panic_info);
    }));
}
