//! Terminal UI for zterm.
//!
//! This crate provides the ratatui front-end over the panel execution
//! engine: the main event loop, the stack layout, the console prompt with
//! command dispatch, floating pop-ups and the theme.
//!
//! ## Keybindings
//!
//! - `Ctrl+C` / `F10` - quit
//! - `Tab` - next panel
//! - `F1` - toggle the help pop-up
//! - `Esc` / `` ` `` - toggle the console
//! - `Ctrl+R` - cycle the focused panel's refresh interval
//! - `Ctrl+Z` - disconnect the focused panel's stream
//! - floaties scroll with `PgUp`/`PgDn`/`Home`/`End`/arrows, `Esc` closes

pub mod app;
pub mod commands;
pub mod console;
pub mod event;
pub mod floaty;
pub mod theme;

pub use app::{App, Engine};
pub use console::Console;
pub use event::{map_key, AppEvent, KeyContext};
pub use floaty::Floaty;
pub use theme::{ColorSpace, Theme};
