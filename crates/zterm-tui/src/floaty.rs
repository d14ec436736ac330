//! Floating pop-up panels.
//!
//! A floaty overlays the stack layout: help, one-shot command output, the
//! refresh-interval notice. It wraps an engine panel (so producers can
//! stream into it like into any other sink) plus placement and scroll state.

use ratatui::layout::Rect;

use zterm_engine::Panel;

/// Lines moved by PgUp/PgDn.
pub const PAGE_SCROLL: i32 = 10;

/// Name of the help pop-up.
pub const HELP_NAME: &str = "help-window";

/// Name of the console's one-shot command output pop-up.
pub const OUTPUT_NAME: &str = "console-output";

/// Name of the refresh-interval notice pop-up.
pub const REFRESH_NAME: &str = "refresh-popup";

/// A floating pop-up wrapping an engine panel.
pub struct Floaty {
    pub panel: Panel,
    /// Requested width; 0 means "almost full width".
    pub width: u16,
    /// Requested height (content rows, without the frame).
    pub height: u16,
    /// Manual scroll offset; ignored while sticking to the bottom.
    pub scroll: i32,
    /// Follow new content at the bottom.
    pub stick_bottom: bool,
}

impl Floaty {
    pub fn new(panel: Panel, width: u16, height: u16) -> Floaty {
        Floaty {
            panel,
            width,
            height,
            scroll: 0,
            stick_bottom: true,
        }
    }

    pub fn name(&self) -> &str {
        self.panel.name()
    }

    /// The on-screen rectangle: centered, clamped into `area`.
    pub fn rect(&self, area: Rect) -> Rect {
        let width = if self.width == 0 {
            area.width.saturating_sub(2)
        } else {
            self.width.min(area.width)
        };
        let height = (self.height + 2).min(area.height);
        let x = area.width.saturating_sub(width) / 2;
        let y = area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }

    /// Scroll by a delta, leaving bottom-follow mode.
    pub fn scroll_by(&mut self, delta: i32, content_lines: usize) {
        let max = content_lines.saturating_sub(self.height as usize) as i32;
        let base = if self.stick_bottom { max } else { self.scroll };
        self.scroll = (base + delta).clamp(0, max.max(0));
        self.stick_bottom = self.scroll >= max;
    }

    pub fn scroll_top(&mut self) {
        self.scroll = 0;
        self.stick_bottom = false;
    }

    pub fn scroll_bottom(&mut self) {
        self.stick_bottom = true;
    }

    /// Effective scroll offset for rendering `content_lines` in `view_rows`.
    pub fn scroll_offset(&self, content_lines: usize, view_rows: u16) -> u16 {
        let max = content_lines.saturating_sub(view_rows as usize);
        if self.stick_bottom {
            max as u16
        } else {
            (self.scroll.max(0) as usize).min(max) as u16
        }
    }
}

/// Build the help pop-up.
pub fn help_floaty() -> Floaty {
    let body = "\
Help for the zterm dashboard:
  - Ctrl+C or F10 to exit
  - Esc or ` to invoke the console (type commands there)
  - Tab to swap between views
  - Ctrl+R to cycle a view's refresh interval
  - Ctrl+Z to stop a view's current stream

Console commands:
  addview <name>                        add a new view
  attach <name> [remote] <cmd...>       attach a refresh job
  resize <name> [n]                     grow a view's height weight
  view <name> hi-word|hi-line|hi-remove <word>
  remote <cmd...>                       run a one-shot remote command
  vim <file>                            edit a file (dataset names start with //)
  savecfg                               write the configuration back
  exit                                  quit";
    Floaty::new(Panel::new(HELP_NAME, i32::MAX, 0, body), 0, 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_centered_and_clamped() {
        let floaty = Floaty::new(Panel::new("f", 1, 0, ""), 20, 5);
        let rect = floaty.rect(Rect::new(0, 0, 80, 24));
        assert_eq!(rect.width, 20);
        assert_eq!(rect.height, 7);
        assert_eq!(rect.x, 30);

        let tiny = floaty.rect(Rect::new(0, 0, 10, 4));
        assert!(tiny.width <= 10);
        assert!(tiny.height <= 4);
    }

    #[test]
    fn test_scroll_clamps() {
        let mut floaty = Floaty::new(Panel::new("f", 1, 0, ""), 0, 5);
        floaty.scroll_by(-100, 50);
        assert_eq!(floaty.scroll, 0);
        assert!(!floaty.stick_bottom);
        floaty.scroll_by(1000, 50);
        assert_eq!(floaty.scroll, 45);
        assert!(floaty.stick_bottom);
    }

    #[test]
    fn test_scroll_offset_sticks_to_bottom() {
        let floaty = Floaty::new(Panel::new("f", 1, 0, ""), 0, 5);
        assert_eq!(floaty.scroll_offset(30, 10), 20);
        let mut manual = Floaty::new(Panel::new("f", 1, 0, ""), 0, 5);
        manual.scroll_top();
        assert_eq!(manual.scroll_offset(30, 10), 0);
    }

    #[test]
    fn test_help_floaty_mentions_console() {
        let help = help_floaty();
        assert_eq!(help.name(), HELP_NAME);
        assert!(help.panel.lines().iter().any(|l| l.contains("console")));
    }
}
