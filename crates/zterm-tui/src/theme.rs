//! Theme resolution.
//!
//! The config document names colors for seven slots plus a color space. The
//! slots resolve to ratatui colors for frames and text, and to the SGR
//! sequence the engine wraps highlighted words with (panel buffers carry raw
//! ANSI, so the highlight color has to exist as an escape sequence too).

use ratatui::style::Color;

use zterm_core::ThemeConfig;

/// Terminal color capability, from the `color-space` config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// 8/16 color SGR only.
    Basic,
    /// 256-color palette.
    #[default]
    Ansi256,
    /// 24-bit color.
    TrueColor,
}

impl ColorSpace {
    pub fn parse(s: &str) -> ColorSpace {
        match s.trim() {
            "basic" => ColorSpace::Basic,
            "truecolor" => ColorSpace::TrueColor,
            _ => ColorSpace::Ansi256,
        }
    }
}

/// Resolved theme colors.
#[derive(Debug, Clone)]
pub struct Theme {
    pub color_space: ColorSpace,
    pub fg: Color,
    pub bg: Color,
    pub frame: Color,
    pub frame_select: Color,
    pub console: Color,
    pub error: Color,
    pub highlight: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::default(),
            fg: Color::Reset,
            bg: Color::Reset,
            frame: Color::Green,
            frame_select: Color::Yellow,
            console: Color::Cyan,
            error: Color::Red,
            highlight: Color::Magenta,
        }
    }
}

impl Theme {
    /// Resolve the config slots; unparseable or empty slots keep defaults.
    pub fn from_config(config: &ThemeConfig) -> Theme {
        let mut theme = Theme {
            color_space: ColorSpace::parse(&config.color_space),
            ..Theme::default()
        };
        for (slot, value) in [
            (&mut theme.fg, &config.fgcolor),
            (&mut theme.bg, &config.bgcolor),
            (&mut theme.frame, &config.frame),
            (&mut theme.frame_select, &config.frame_select),
            (&mut theme.console, &config.console),
            (&mut theme.error, &config.error),
            (&mut theme.highlight, &config.highlight),
        ] {
            if let Some(color) = parse_color(value) {
                *slot = color;
            }
        }
        theme
    }

    /// SGR foreground sequence for the highlight color, handed to panels.
    pub fn highlight_seq(&self) -> String {
        sgr_fg(self.highlight, self.color_space)
    }
}

/// Parse a color name, `#rrggbb` hex value or palette index.
pub fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Color::Rgb(r, g, b));
        }
        return None;
    }
    if let Ok(index) = s.parse::<u8>() {
        return Some(Color::Indexed(index));
    }
    let color = match s.to_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => return None,
    };
    Some(color)
}

/// SGR foreground sequence for a color within a color space.
pub fn sgr_fg(color: Color, space: ColorSpace) -> String {
    let index = ansi_index(color);
    match space {
        ColorSpace::Basic => match index {
            Some(i) if i < 8 => format!("\x1b[{}m", 30 + i),
            Some(i) if i < 16 => format!("\x1b[{};1m", 30 + i - 8),
            _ => {
                let i = reduce_to_256(color) % 8;
                format!("\x1b[{}m", 30 + i)
            }
        },
        ColorSpace::Ansi256 => {
            let i = index.unwrap_or_else(|| reduce_to_256(color));
            format!("\x1b[38;5;{i}m")
        }
        ColorSpace::TrueColor => match color {
            Color::Rgb(r, g, b) => format!("\x1b[38;2;{r};{g};{b}m"),
            _ => {
                let i = index.unwrap_or_else(|| reduce_to_256(color));
                format!("\x1b[38;5;{i}m")
            }
        },
    }
}

fn ansi_index(color: Color) -> Option<u8> {
    let index = match color {
        Color::Black => 0,
        Color::Red => 1,
        Color::Green => 2,
        Color::Yellow => 3,
        Color::Blue => 4,
        Color::Magenta => 5,
        Color::Cyan => 6,
        Color::Gray => 7,
        Color::DarkGray => 8,
        Color::LightRed => 9,
        Color::LightGreen => 10,
        Color::LightYellow => 11,
        Color::LightBlue => 12,
        Color::LightMagenta => 13,
        Color::LightCyan => 14,
        Color::White => 15,
        Color::Indexed(i) => i,
        _ => return None,
    };
    Some(index)
}

/// Map an RGB color onto the 6x6x6 palette cube.
fn reduce_to_256(color: Color) -> u8 {
    match color {
        Color::Rgb(r, g, b) => {
            let scale = |v: u8| (v as u16 * 5 / 255) as u8;
            16 + 36 * scale(r) + 6 * scale(g) + scale(b)
        }
        _ => 7,
    }
}
