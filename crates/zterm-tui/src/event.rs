//! Key event mapping.
//!
//! Translates crossterm key events into application events based on what
//! currently has focus: the console prompt, a floating pop-up, or a stack
//! panel. Global bindings (quit, help, console toggle) win everywhere.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What the key routing needs to know about the current focus.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext {
    pub console_open: bool,
    pub floaty_open: bool,
}

/// Application-level events triggered by keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Quit the application
    Quit,
    /// Focus the next stack panel
    NextPanel,
    /// Toggle the help pop-up
    ToggleHelp,
    /// Toggle the console prompt
    ToggleConsole,
    /// Close the topmost floating pop-up
    CloseFloaty,
    /// Cycle the focused panel's refresh interval
    CycleRefresh,
    /// Disconnect the focused panel's current stream
    DisconnectPanel,
    /// Scroll the topmost floaty by a line/page delta
    FloatyScroll(i32),
    /// Jump the topmost floaty to the top
    FloatyTop,
    /// Jump the topmost floaty to the bottom
    FloatyBottom,
    /// Type a character into the console prompt
    ConsoleChar(char),
    ConsoleBackspace,
    ConsoleDelete,
    ConsoleLeft,
    ConsoleRight,
    ConsoleHome,
    ConsoleEnd,
    /// Ctrl+U: delete to start of line
    ConsoleKillToStart,
    /// Dispatch the prompt line
    ConsoleSubmit,
    ConsoleHistoryPrev,
    ConsoleHistoryNext,
    /// Tab completion
    ConsoleComplete,
    /// Ctrl+Z: cancel the running console command
    ConsoleCancel,
    /// No action needed
    None,
}

/// Map a key event to an application event.
pub fn map_key(key: KeyEvent, ctx: KeyContext) -> AppEvent {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global bindings first
    if ctrl && key.code == KeyCode::Char('c') {
        return AppEvent::Quit;
    }
    match key.code {
        KeyCode::F(10) => return AppEvent::Quit,
        KeyCode::F(1) => return AppEvent::ToggleHelp,
        KeyCode::Char('`') if !ctrl => return AppEvent::ToggleConsole,
        KeyCode::Esc => {
            return if ctx.floaty_open {
                AppEvent::CloseFloaty
            } else {
                AppEvent::ToggleConsole
            };
        }
        _ => {}
    }

    if ctx.console_open {
        return map_console_key(key, ctrl);
    }
    if ctx.floaty_open {
        return map_floaty_key(key);
    }

    // Stack panel focus
    match key.code {
        KeyCode::Tab => AppEvent::NextPanel,
        KeyCode::Char('r') if ctrl => AppEvent::CycleRefresh,
        KeyCode::Char('z') if ctrl => AppEvent::DisconnectPanel,
        _ => AppEvent::None,
    }
}

fn map_console_key(key: KeyEvent, ctrl: bool) -> AppEvent {
    if ctrl {
        return match key.code {
            KeyCode::Char('u') => AppEvent::ConsoleKillToStart,
            KeyCode::Char('a') => AppEvent::ConsoleHome,
            KeyCode::Char('e') => AppEvent::ConsoleEnd,
            KeyCode::Char('z') => AppEvent::ConsoleCancel,
            _ => AppEvent::None,
        };
    }
    match key.code {
        KeyCode::Enter => AppEvent::ConsoleSubmit,
        KeyCode::Backspace => AppEvent::ConsoleBackspace,
        KeyCode::Delete => AppEvent::ConsoleDelete,
        KeyCode::Left => AppEvent::ConsoleLeft,
        KeyCode::Right => AppEvent::ConsoleRight,
        KeyCode::Home => AppEvent::ConsoleHome,
        KeyCode::End => AppEvent::ConsoleEnd,
        KeyCode::Up => AppEvent::ConsoleHistoryPrev,
        KeyCode::Down => AppEvent::ConsoleHistoryNext,
        KeyCode::Tab => AppEvent::ConsoleComplete,
        KeyCode::Char(c) => AppEvent::ConsoleChar(c),
        _ => AppEvent::None,
    }
}

fn map_floaty_key(key: KeyEvent) -> AppEvent {
    const PAGE: i32 = 10;
    match key.code {
        KeyCode::PageUp => AppEvent::FloatyScroll(-PAGE),
        KeyCode::PageDown => AppEvent::FloatyScroll(PAGE),
        KeyCode::Up => AppEvent::FloatyScroll(-1),
        KeyCode::Down => AppEvent::FloatyScroll(1),
        KeyCode::Home => AppEvent::FloatyTop,
        KeyCode::End => AppEvent::FloatyBottom,
        KeyCode::Tab => AppEvent::NextPanel,
        _ => AppEvent::None,
    }
}
