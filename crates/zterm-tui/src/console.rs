//! The console prompt.
//!
//! A single-line editable prompt with command history and two-level Tab
//! completion (command, then operand). The console's output region is an
//! engine panel so that background tasks can report into it through the UI
//! queue like any other sink.

use zterm_engine::Panel;

/// Console commands and whether their first operand is a view name.
const COMMANDS: &[(&str, bool)] = &[
    ("addview", false),
    ("attach", true),
    ("exit", false),
    ("help", false),
    ("remote", false),
    ("resize", true),
    ("savecfg", false),
    ("view", true),
    ("vim", false),
];

/// Console prompt state.
pub struct Console {
    /// Whether the console overlays the dashboard.
    pub open: bool,
    input: Vec<char>,
    cursor: usize,
    history: Vec<String>,
    /// Index into `history`; equal to `history.len()` means "blank".
    hist_index: usize,
    output: Panel,
}

impl Console {
    pub fn new() -> Console {
        Console {
            open: false,
            input: Vec::new(),
            cursor: 0,
            history: Vec::new(),
            hist_index: 0,
            output: Panel::new("console", i32::MAX, 0, ""),
        }
    }

    /// The output region panel; command status and errors land here.
    pub fn output(&self) -> &Panel {
        &self.output
    }

    /// Current prompt content.
    pub fn input(&self) -> String {
        self.input.iter().collect()
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn insert(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.input.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        if self.cursor < self.input.len() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.input.len();
    }

    /// Ctrl+U: delete from the start of the line to the cursor.
    pub fn kill_to_start(&mut self) {
        self.input.drain(..self.cursor);
        self.cursor = 0;
    }

    /// Take the prompt line for dispatch, recording it in history.
    pub fn submit(&mut self) -> String {
        let line: String = self.input.drain(..).collect();
        self.cursor = 0;
        self.history.push(line.clone());
        self.hist_index = self.history.len();
        line
    }

    /// Walk one step back in history.
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        self.hist_index = self.hist_index.saturating_sub(1);
        self.set_input(self.history[self.hist_index].clone());
    }

    /// Walk one step forward in history; past the end restores a blank line.
    pub fn history_next(&mut self) {
        if self.history.is_empty() {
            return;
        }
        if self.hist_index + 1 >= self.history.len() {
            self.hist_index = self.history.len();
            self.set_input(String::new());
        } else {
            self.hist_index += 1;
            self.set_input(self.history[self.hist_index].clone());
        }
    }

    fn set_input(&mut self, s: String) {
        self.input = s.chars().collect();
        self.cursor = self.input.len();
    }

    /// Tab completion: the first token completes against the command list,
    /// the second against view names for commands that take one.
    pub fn complete(&mut self, view_names: &[String]) {
        let line = self.input();
        let mut parts = line.splitn(2, ' ');
        let first = parts.next().unwrap_or("");
        let rest = parts.next();

        match rest {
            None => {
                if let Some((name, _)) = COMMANDS
                    .iter()
                    .find(|(name, _)| name.starts_with(first) && *name != first)
                {
                    self.set_input(format!("{name} "));
                }
            }
            Some(operand) if !operand.contains(' ') => {
                let takes_view = COMMANDS
                    .iter()
                    .any(|(name, takes_view)| *name == first && *takes_view);
                if !takes_view {
                    return;
                }
                if let Some(name) = view_names
                    .iter()
                    .find(|name| name.starts_with(operand) && name.as_str() != operand)
                {
                    self.set_input(format!("{first} {name}"));
                }
            }
            _ => {}
        }
    }

    /// Record a command outcome in the output region.
    pub fn report(&self, result: &Result<String, zterm_core::ZtermError>) {
        self.output.clear();
        match result {
            Ok(msg) if msg.is_empty() => {}
            Ok(msg) => self.output.print(msg),
            Err(err) => self.output.error(err),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
