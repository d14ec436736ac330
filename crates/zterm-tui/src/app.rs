//! Application state and the main loop.
//!
//! [`Engine`] is the process-wide state threaded through the components:
//! the panel collection, the running refresh loops, the floaties, the shared
//! SSH client, the UI queue and the suspend coordinator. [`App`] wraps it
//! with the console, focus tracking and the crossterm/ratatui terminal
//! lifecycle, including teardown and rebuild around the suspend handshake.

use std::collections::HashMap;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ansi_to_tui::IntoText;
use crossterm::event::{Event, KeyEvent, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::Style,
    text::Text,
    widgets::{Block, Clear, Paragraph},
    Frame, Terminal,
};
use tracing::{info, warn};

use zterm_core::{Config, Result, ViewConfig, ZtermError};
use zterm_engine::{
    next_interval, spawn_bridge, spawn_job, Channel, Highlight, Job, Panel, RefreshLoop,
    RemoteClient, SuspendCoordinator, UiMessage, UiQueue, UiReceiver,
};

use crate::commands;
use crate::console::Console;
use crate::event::{map_key, AppEvent, KeyContext};
use crate::floaty::{help_floaty, Floaty, HELP_NAME, OUTPUT_NAME, REFRESH_NAME};
use crate::theme::Theme;

type Backend = Terminal<CrosstermBackend<Stdout>>;

/// Process-wide engine state, initialised once and torn down once.
pub struct Engine {
    pub config: Config,
    pub theme: Theme,
    /// Stack panels, kept sorted by position.
    pub panels: Vec<Panel>,
    /// Running refresh loops keyed by panel name.
    pub loops: HashMap<String, RefreshLoop>,
    /// Floating pop-ups, last on top.
    pub floaties: Vec<Floaty>,
    pub remote: Option<Arc<dyn RemoteClient>>,
    pub ui: UiQueue,
    pub suspend: SuspendCoordinator,
    /// The console's output region; background tasks report here.
    pub console_out: Panel,
    pub default_interval: Duration,
}

impl Engine {
    pub fn new(
        config: Config,
        remote: Option<Arc<dyn RemoteClient>>,
        ui: UiQueue,
        suspend: SuspendCoordinator,
        console_out: Panel,
    ) -> Engine {
        let theme = Theme::from_config(&config.theme);
        let default_interval = Duration::from_secs(config.server.refresh.max(1));

        let mut panels = Vec::new();
        for (name, view) in &config.views {
            let panel = Panel::new(name, view.position, view.size, &format!("Loading {name}...\n"));
            panel.set_highlight_seq(theme.highlight_seq());
            for word in &view.hiword {
                panel.set_highlight(word.clone(), Highlight::Word);
            }
            for word in &view.hiline {
                panel.set_highlight(word.clone(), Highlight::Line);
            }
            panel.set_job(view.job.clone());
            panels.push(panel);
        }
        panels.sort_by_key(Panel::position);

        Engine {
            config,
            theme,
            panels,
            loops: HashMap::new(),
            floaties: Vec::new(),
            remote,
            ui,
            suspend,
            console_out,
            default_interval,
        }
    }

    /// Start refresh loops for every panel that carries a job.
    pub fn start_jobs(&mut self) {
        let named: Vec<String> = self
            .panels
            .iter()
            .filter(|p| p.job().is_some())
            .map(|p| p.name().to_string())
            .collect();
        for name in named {
            self.start_job(&name, self.default_interval);
        }
    }

    /// Look a stack panel up by name.
    pub fn panel(&self, name: &str) -> Option<Panel> {
        self.panels.iter().find(|p| p.name() == name).cloned()
    }

    /// Stack panel names, in layout order.
    pub fn panel_names(&self) -> Vec<String> {
        self.panels.iter().map(|p| p.name().to_string()).collect()
    }

    /// (Re)start the refresh loop for a panel's job.
    pub fn start_job(&mut self, name: &str, interval: Duration) {
        let Some(panel) = self.panel(name) else {
            return;
        };
        let Some(job) = panel.job() else {
            return;
        };
        if let Some(old) = self.loops.remove(name) {
            old.stop();
        }
        let looper = RefreshLoop::spawn(
            panel,
            Job::parse(&job),
            interval,
            self.remote.clone(),
            self.ui.clone(),
            self.suspend.clone(),
        );
        self.loops.insert(name.to_string(), looper);
    }

    /// Stop a panel's refresh loop.
    pub fn stop_job(&mut self, name: &str) {
        if let Some(looper) = self.loops.remove(name) {
            looper.stop();
        }
    }

    /// Install a new job on a panel and restart its loop.
    pub fn attach(&mut self, name: &str, job: String) -> Result<()> {
        if self.panel(name).is_none() {
            return Err(ZtermError::UnknownView { name: name.into() });
        }
        let interval = self
            .loops
            .get(name)
            .map(|l| l.interval())
            .unwrap_or(self.default_interval);
        self.stop_job(name);
        if let Some(panel) = self.panel(name) {
            panel.set_job(Some(job));
        }
        self.start_job(name, interval);
        Ok(())
    }

    /// Create a new empty panel after the existing ones.
    pub fn add_view(&mut self, name: &str) -> Result<()> {
        if self.panel(name).is_some() {
            return Err(ZtermError::DuplicateView { name: name.into() });
        }
        let position = self.panels.iter().map(|p| p.position()).max().unwrap_or(0) + 1;
        let panel = Panel::new(name, position, 10, "new view");
        panel.set_highlight_seq(self.theme.highlight_seq());
        self.panels.push(panel);
        self.panels.sort_by_key(Panel::position);
        info!(view = name, position, "view added");
        Ok(())
    }

    /// Add `delta` to a panel's height weight.
    pub fn resize_view(&mut self, name: &str, delta: i64) -> Result<()> {
        let panel = self
            .panel(name)
            .ok_or_else(|| ZtermError::UnknownView { name: name.into() })?;
        panel.resize(delta);
        Ok(())
    }

    /// Cycle a panel's refresh interval and raise the transient notice.
    pub fn cycle_refresh(&mut self, name: &str) {
        let Some(panel) = self.panel(name) else {
            return;
        };
        let current = self
            .loops
            .get(name)
            .map(|l| l.interval())
            .unwrap_or(self.default_interval);
        let next = next_interval(current);
        if panel.job().is_some() {
            self.stop_job(name);
            self.start_job(name, next);
        }
        self.popup(
            REFRESH_NAME,
            &format!("refresh interval changed to {}s", next.as_secs()),
            44,
            1,
        );
    }

    /// Run a one-shot job into the console output floaty.
    pub fn run_once(&mut self, job: Job) {
        let panel = match self.floaties.iter().find(|f| f.name() == OUTPUT_NAME) {
            Some(floaty) => {
                floaty.panel.clear();
                floaty.panel.clone()
            }
            None => {
                let panel = Panel::new(OUTPUT_NAME, i32::MAX, 0, "");
                panel.set_highlight_seq(self.theme.highlight_seq());
                self.floaties.push(Floaty::new(panel.clone(), 0, 18));
                panel
            }
        };
        let (channel, sink) = Channel::new();
        spawn_job(&job, self.remote.clone(), sink);
        panel.connect(channel.clone());
        spawn_bridge(panel, channel, self.ui.clone(), self.suspend.clone());
    }

    /// Show or refresh a simple text pop-up.
    pub fn popup(&mut self, name: &str, body: &str, width: u16, height: u16) {
        match self.floaties.iter().find(|f| f.name() == name) {
            Some(floaty) => {
                floaty.panel.clear();
                floaty.panel.print(body);
            }
            None => {
                let panel = Panel::new(name, i32::MAX, 0, body);
                self.floaties.push(Floaty::new(panel, width, height));
            }
        }
    }

    /// Toggle the help pop-up.
    pub fn toggle_help(&mut self) {
        match self.floaties.iter().position(|f| f.name() == HELP_NAME) {
            Some(idx) => self.close_floaty_at(idx),
            None => self.floaties.push(help_floaty()),
        }
    }

    /// Close the topmost floaty, stopping its stream.
    pub fn close_top_floaty(&mut self) {
        if let Some(floaty) = self.floaties.pop() {
            floaty.panel.disconnect();
        }
    }

    fn close_floaty_at(&mut self, idx: usize) {
        let floaty = self.floaties.remove(idx);
        floaty.panel.disconnect();
    }

    /// Ctrl+Z on the console: stop the one-shot command's stream.
    pub fn cancel_console_command(&self) {
        if let Some(floaty) = self.floaties.iter().find(|f| f.name() == OUTPUT_NAME) {
            floaty.panel.disconnect();
        }
    }

    /// Serialise panel state back into the config document and write it.
    pub fn save_config(&mut self) -> Result<PathBuf> {
        self.config.views.clear();
        for panel in &self.panels {
            let mut hiline = Vec::new();
            let mut hiword = Vec::new();
            for (word, mode) in panel.highlights() {
                match mode {
                    Highlight::Line => hiline.push(word),
                    Highlight::Word => hiword.push(word),
                }
            }
            self.config.views.insert(
                panel.name().to_string(),
                ViewConfig {
                    position: panel.position(),
                    size: panel.size(),
                    job: panel.job(),
                    hiline,
                    hiword,
                },
            );
        }
        self.config.save()
    }

    /// Stop every loop and stream. Called once on shutdown.
    pub fn shutdown(&mut self) {
        for (_, looper) in self.loops.drain() {
            looper.stop();
        }
        for panel in &self.panels {
            panel.disconnect();
        }
        for floaty in &self.floaties {
            floaty.panel.disconnect();
        }
    }
}

/// The application: engine state plus console, focus and the terminal.
pub struct App {
    pub engine: Engine,
    console: Console,
    focus: usize,
    should_quit: bool,
}

impl App {
    /// Build the app from a loaded config. Returns the UI queue receiver the
    /// main loop drains.
    pub fn new(config: Config, remote: Option<Arc<dyn RemoteClient>>) -> (App, UiReceiver) {
        let (ui, rx) = UiQueue::new();
        let suspend = SuspendCoordinator::new();
        let console = Console::new();
        let engine = Engine::new(config, remote, ui, suspend, console.output().clone());

        let mut app = App {
            engine,
            console,
            focus: 0,
            should_quit: false,
        };
        // An empty dashboard starts with the help pop-up.
        if app.engine.panels.is_empty() {
            app.engine.toggle_help();
        }
        (app, rx)
    }

    /// Run the main loop until quit.
    pub async fn run(&mut self, mut rx: UiReceiver) -> Result<()> {
        // Job startup needs the runtime; App::new may run outside of it.
        self.engine.start_jobs();
        let mut terminal = init_terminal()?;
        info!("dashboard started");

        while !self.should_quit {
            self.drain_ui(&mut rx, &mut terminal).await?;
            if self.should_quit {
                break;
            }
            terminal
                .draw(|frame| self.draw(frame))
                .map_err(terminal_error)?;

            if crossterm::event::poll(Duration::from_millis(50)).map_err(terminal_error)? {
                match crossterm::event::read().map_err(terminal_error)? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
                    _ => {}
                }
            }
        }

        self.engine.shutdown();
        restore_terminal(&mut terminal)?;
        info!("dashboard exited");
        Ok(())
    }

    /// Drain the UI queue: run update closures, honor the quit and suspend
    /// sentinels.
    async fn drain_ui(&mut self, rx: &mut UiReceiver, terminal: &mut Backend) -> Result<()> {
        while let Some(msg) = rx.try_next() {
            match msg {
                UiMessage::Update(f) => f(),
                UiMessage::Quit => {
                    self.should_quit = true;
                }
                UiMessage::Suspend => {
                    // Hand the real terminal to the waiting command, then
                    // rebuild once it is done.
                    restore_terminal(terminal)?;
                    self.engine.suspend.begin_suspend();
                    self.engine.suspend.resumed().await;
                    self.engine.suspend.rearm();
                    *terminal = init_terminal()?;
                    terminal.clear().map_err(terminal_error)?;
                }
            }
        }
        Ok(())
    }

    fn focused_name(&self) -> Option<String> {
        self.engine
            .panels
            .get(self.focus)
            .map(|p| p.name().to_string())
    }

    /// Route one key event.
    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctx = KeyContext {
            console_open: self.console.open,
            floaty_open: !self.engine.floaties.is_empty(),
        };
        match map_key(key, ctx) {
            AppEvent::Quit => self.should_quit = true,
            AppEvent::NextPanel => {
                if !self.engine.panels.is_empty() {
                    self.focus = (self.focus + 1) % self.engine.panels.len();
                }
            }
            AppEvent::ToggleHelp => self.engine.toggle_help(),
            AppEvent::ToggleConsole => self.console.toggle(),
            AppEvent::CloseFloaty => self.engine.close_top_floaty(),
            AppEvent::CycleRefresh => {
                if let Some(name) = self.focused_name() {
                    self.engine.cycle_refresh(&name);
                }
            }
            AppEvent::DisconnectPanel => {
                if let Some(panel) = self.engine.panels.get(self.focus) {
                    panel.disconnect();
                }
            }
            AppEvent::FloatyScroll(delta) => {
                if let Some(floaty) = self.engine.floaties.last_mut() {
                    let lines = floaty.panel.line_count();
                    floaty.scroll_by(delta, lines);
                }
            }
            AppEvent::FloatyTop => {
                if let Some(floaty) = self.engine.floaties.last_mut() {
                    floaty.scroll_top();
                }
            }
            AppEvent::FloatyBottom => {
                if let Some(floaty) = self.engine.floaties.last_mut() {
                    floaty.scroll_bottom();
                }
            }
            AppEvent::ConsoleChar(c) => self.console.insert(c),
            AppEvent::ConsoleBackspace => self.console.backspace(),
            AppEvent::ConsoleDelete => self.console.delete(),
            AppEvent::ConsoleLeft => self.console.left(),
            AppEvent::ConsoleRight => self.console.right(),
            AppEvent::ConsoleHome => self.console.home(),
            AppEvent::ConsoleEnd => self.console.end(),
            AppEvent::ConsoleKillToStart => self.console.kill_to_start(),
            AppEvent::ConsoleHistoryPrev => self.console.history_prev(),
            AppEvent::ConsoleHistoryNext => self.console.history_next(),
            AppEvent::ConsoleComplete => {
                let names = self.engine.panel_names();
                self.console.complete(&names);
            }
            AppEvent::ConsoleCancel => self.engine.cancel_console_command(),
            AppEvent::ConsoleSubmit => {
                let line = self.console.submit();
                if line.trim().is_empty() {
                    return;
                }
                let result = commands::execute(&mut self.engine, &line);
                if let Err(err) = &result {
                    warn!(command = %line, error = %err, "console command failed");
                }
                self.console.report(&result);
            }
            AppEvent::None => {}
        }
    }

    /// Render one frame: the panel stack, then the console, then floaties.
    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let theme = &self.engine.theme;
        frame.render_widget(
            Block::default().style(Style::default().fg(theme.fg).bg(theme.bg)),
            area,
        );

        let visible: Vec<Panel> = self
            .engine
            .panels
            .iter()
            .filter(|p| !p.is_hidden())
            .cloned()
            .collect();
        let total: i64 = visible.iter().map(|p| p.size().max(1)).sum::<i64>().max(1);

        let mut y = 0u16;
        for (idx, panel) in visible.iter().enumerate() {
            let remaining = area.height.saturating_sub(y);
            if remaining == 0 {
                break;
            }
            let height = if idx == visible.len() - 1 {
                // The last panel absorbs rounding leftovers.
                remaining
            } else {
                let share = (area.height as i64 * panel.size().max(1)) / total;
                (share.max(3) as u16).min(remaining)
            };
            let rect = Rect::new(0, y, area.width, height);
            self.render_panel(frame, rect, panel, idx == self.focus);
            y += height;
        }

        if self.console.open {
            self.render_console(frame, area);
        }
        for floaty in &self.engine.floaties {
            render_floaty(frame, area, floaty, theme);
        }
    }

    fn render_panel(&self, frame: &mut Frame, rect: Rect, panel: &Panel, focused: bool) {
        let theme = &self.engine.theme;
        let (color, title) = if focused {
            (theme.frame_select, format!("[ {} ]", panel.name()))
        } else {
            (theme.frame, format!("| {} |", panel.name()))
        };
        let block = Block::bordered()
            .border_style(Style::default().fg(color))
            .title(title);
        let inner_height = rect.height.saturating_sub(2) as usize;
        let lines = panel.lines();
        // Autoscroll: writes pin the view to the newest content.
        let scroll = lines.len().saturating_sub(inner_height) as u16;
        frame.render_widget(
            Paragraph::new(ansi_text(&lines)).block(block).scroll((scroll, 0)),
            rect,
        );
    }

    fn render_console(&self, frame: &mut Frame, area: Rect) {
        let theme = &self.engine.theme;
        let height = 4u16.min(area.height);
        let rect = Rect::new(0, area.height - height, area.width, height);
        frame.render_widget(Clear, rect);

        let block = Block::bordered()
            .border_style(Style::default().fg(theme.console))
            .title("< console >");
        let inner = block.inner(rect);
        frame.render_widget(block, rect);
        if inner.height == 0 {
            return;
        }

        let prompt_rect = Rect::new(inner.x, inner.y, inner.width, 1);
        frame.render_widget(
            Paragraph::new(format!("> {}", self.console.input())),
            prompt_rect,
        );
        frame.set_cursor_position((
            inner.x + 2 + self.console.cursor() as u16,
            inner.y,
        ));

        if inner.height > 1 {
            let status_rect = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
            let lines = self.console.output().lines();
            frame.render_widget(Paragraph::new(ansi_text(&lines)), status_rect);
        }
    }
}

fn render_floaty(frame: &mut Frame, area: Rect, floaty: &Floaty, theme: &Theme) {
    let rect = floaty.rect(area);
    frame.render_widget(Clear, rect);

    let lines = floaty.panel.lines();
    let inner_height = rect.height.saturating_sub(2);
    let offset = floaty.scroll_offset(lines.len(), inner_height);
    let title = format!(
        "< {} - ({}-{}/{}) >",
        floaty.name(),
        offset,
        (offset as usize + inner_height as usize).min(lines.len()),
        lines.len()
    );
    let block = Block::bordered()
        .border_style(Style::default().fg(theme.frame_select))
        .title(title);
    frame.render_widget(
        Paragraph::new(ansi_text(&lines)).block(block).scroll((offset, 0)),
        rect,
    );
}

/// Parse the panel's SGR-carrying lines into styled text; on a parse error
/// fall back to the raw content.
fn ansi_text(lines: &[String]) -> Text<'static> {
    let joined = lines.join("\n");
    joined
        .clone()
        .into_text()
        .unwrap_or_else(|_| Text::raw(joined))
}

fn init_terminal() -> Result<Backend> {
    crossterm::terminal::enable_raw_mode().map_err(terminal_error)?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen).map_err(terminal_error)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(terminal_error)
}

fn restore_terminal(terminal: &mut Backend) -> Result<()> {
    crossterm::terminal::disable_raw_mode().map_err(terminal_error)?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )
    .map_err(terminal_error)?;
    terminal.show_cursor().map_err(terminal_error)?;
    Ok(())
}

fn terminal_error(e: io::Error) -> ZtermError {
    ZtermError::Terminal {
        message: e.to_string(),
    }
}
