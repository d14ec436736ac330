//! Panels: addressable output sinks with a bounded display buffer.
//!
//! A [`Panel`] is the engine-side model of one on-screen region: a name, a
//! stack position, a height weight, highlight rules and a scroll buffer of
//! rendered lines. It also tracks the single live [`Channel`] feeding it; a
//! panel is never connected to two channels at once.

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::channel::Channel;

/// Retained display lines per panel.
pub const SCROLLBACK_LINES: usize = 1000;

/// Red bold prefix for error lines.
pub const ERROR_PREFIX: &str = "\x1b[31;1merror:\x1b[0m";

const SGR_RESET: &str = "\x1b[0m";
const DEFAULT_HIGHLIGHT_SEQ: &str = "\x1b[35m";

/// Highlight mode for a configured word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// Wrap occurrences of the word.
    Word,
    /// Wrap the whole line containing the word.
    Line,
}

struct PanelState {
    name: String,
    position: i32,
    size: AtomicI64,
    hidden: AtomicBool,
    job: Mutex<Option<String>>,
    highlights: Mutex<BTreeMap<String, Highlight>>,
    highlight_seq: Mutex<String>,
    conn: Mutex<Option<Channel>>,
    buffer: Mutex<VecDeque<String>>,
}

/// Shared handle to one panel.
#[derive(Clone)]
pub struct Panel {
    inner: Arc<PanelState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Panel {
    /// Create a panel with an initial body.
    pub fn new(name: impl Into<String>, position: i32, size: i64, body: &str) -> Panel {
        let panel = Panel {
            inner: Arc::new(PanelState {
                name: name.into(),
                position,
                size: AtomicI64::new(size),
                hidden: AtomicBool::new(false),
                job: Mutex::new(None),
                highlights: Mutex::new(BTreeMap::new()),
                highlight_seq: Mutex::new(DEFAULT_HIGHLIGHT_SEQ.to_string()),
                conn: Mutex::new(None),
                buffer: Mutex::new(VecDeque::new()),
            }),
        };
        if !body.is_empty() {
            panel.print(body);
        }
        panel
    }

    /// The panel's unique name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Position in the stack; panels are laid out top-to-bottom in ascending
    /// order.
    pub fn position(&self) -> i32 {
        self.inner.position
    }

    /// Height weight used by the renderer.
    pub fn size(&self) -> i64 {
        self.inner.size.load(Ordering::Relaxed)
    }

    /// Add `delta` to the height weight.
    pub fn resize(&self, delta: i64) {
        self.inner.size.fetch_add(delta, Ordering::Relaxed);
    }

    /// Whether the panel is currently hidden from layout.
    pub fn is_hidden(&self) -> bool {
        self.inner.hidden.load(Ordering::Relaxed)
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.inner.hidden.store(hidden, Ordering::Relaxed);
    }

    /// The job command string attached to this panel, if any.
    pub fn job(&self) -> Option<String> {
        lock(&self.inner.job).clone()
    }

    pub fn set_job(&self, job: Option<String>) {
        *lock(&self.inner.job) = job;
    }

    /// Install or replace a highlight rule.
    pub fn set_highlight(&self, word: impl Into<String>, mode: Highlight) {
        lock(&self.inner.highlights).insert(word.into(), mode);
    }

    /// Remove a highlight rule.
    pub fn remove_highlight(&self, word: &str) {
        lock(&self.inner.highlights).remove(word);
    }

    /// Snapshot of the highlight rules.
    pub fn highlights(&self) -> BTreeMap<String, Highlight> {
        lock(&self.inner.highlights).clone()
    }

    /// SGR sequence used to wrap highlighted text (theme-provided).
    pub fn set_highlight_seq(&self, seq: impl Into<String>) {
        *lock(&self.inner.highlight_seq) = seq.into();
    }

    /// Connect a channel, stopping any previously connected one.
    pub fn connect(&self, channel: Channel) {
        let mut conn = lock(&self.inner.conn);
        if let Some(old) = conn.replace(channel) {
            old.stop();
        }
    }

    /// Stop the currently connected channel, if any.
    pub fn disconnect(&self) {
        if let Some(conn) = lock(&self.inner.conn).as_ref() {
            conn.stop();
        }
    }

    /// The currently connected channel, if any.
    pub fn channel(&self) -> Option<Channel> {
        lock(&self.inner.conn).clone()
    }

    /// Drop all display content.
    pub fn clear(&self) {
        lock(&self.inner.buffer).clear();
    }

    /// Append text, applying highlight rules line by line.
    pub fn print(&self, text: &str) {
        let highlights = lock(&self.inner.highlights).clone();
        let seq = lock(&self.inner.highlight_seq).clone();
        let text = text.strip_suffix('\n').unwrap_or(text);

        let mut buffer = lock(&self.inner.buffer);
        for line in text.split('\n') {
            buffer.push_back(decorate(line, &highlights, &seq));
            if buffer.len() > SCROLLBACK_LINES {
                buffer.pop_front();
            }
        }
    }

    /// Append an error line with the red `error:` prefix.
    pub fn error(&self, err: &dyn Display) {
        let mut buffer = lock(&self.inner.buffer);
        buffer.push_back(format!("{ERROR_PREFIX} {err}"));
        if buffer.len() > SCROLLBACK_LINES {
            buffer.pop_front();
        }
    }

    /// Snapshot of the display lines.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.inner.buffer).iter().cloned().collect()
    }

    /// Number of display lines.
    pub fn line_count(&self) -> usize {
        lock(&self.inner.buffer).len()
    }
}

/// Apply highlight rules to one line: a whole-line rule wins over word
/// rules; otherwise every matching word rule wraps its occurrences.
fn decorate(line: &str, highlights: &BTreeMap<String, Highlight>, seq: &str) -> String {
    for (word, mode) in highlights {
        if *mode == Highlight::Line && line.contains(word.as_str()) {
            return format!("{seq}{line}{SGR_RESET}");
        }
    }
    let mut out = line.to_string();
    for (word, mode) in highlights {
        if *mode == Highlight::Word && out.contains(word.as_str()) {
            out = out.replace(word.as_str(), &format!("{seq}{word}{SGR_RESET}"));
        }
    }
    out
}
