//! Theme configuration for the TUI.
//!
//! The dashboard follows the clock by default: a light palette during the
//! day and a dark one at night. The palette can also be pinned, or taken
//! from the terminal background.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;
use serde::Deserialize;

use crate::data::{AlertKind, DayPhase};

/// How the palette is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Day palette from 06:00 to 18:59 local time, night palette otherwise.
    #[default]
    Clock,
    /// Detect from the terminal background once at startup.
    Terminal,
    Light,
    Dark,
}

/// Color and style theme for the TUI.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Accent color for titles and active elements.
    pub highlight: Color,
    /// Values above their allowed range.
    pub too_high: Color,
    /// Values below their allowed range.
    pub too_low: Color,
    /// Values inside their range.
    pub healthy: Color,
    pub border: Color,
    pub foliage: Color,
    pub soil: Color,
    /// Style for section headers.
    pub header: Style,
    pub border_type: BorderType,
}

impl Theme {
    /// Palette for light backgrounds and daytime.
    pub fn day() -> Self {
        Self {
            highlight: Color::Blue,
            too_high: Color::Red,
            too_low: Color::Magenta,
            healthy: Color::Green,
            border: Color::DarkGray,
            foliage: Color::Green,
            soil: Color::Rgb(0x8b, 0x5a, 0x2b),
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Palette for dark backgrounds and night.
    pub fn night() -> Self {
        Self {
            highlight: Color::Cyan,
            too_high: Color::LightRed,
            too_low: Color::LightMagenta,
            healthy: Color::LightGreen,
            border: Color::Gray,
            foliage: Color::LightGreen,
            soil: Color::Rgb(0xa0, 0x78, 0x50),
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    pub fn for_phase(phase: DayPhase) -> Self {
        match phase {
            DayPhase::Day => Self::day(),
            DayPhase::Night => Self::night(),
        }
    }

    /// Pick the palette for a mode as of now.
    pub fn resolve(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Clock => Self::for_phase(DayPhase::now()),
            ThemeMode::Terminal => Self::auto_detect(),
            ThemeMode::Light => Self::day(),
            ThemeMode::Dark => Self::night(),
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::day(),
            _ => Self::night(),
        }
    }

    /// Style for a value given its range status.
    pub fn status_style(&self, status: Option<AlertKind>) -> Style {
        match status {
            None => Style::default().fg(self.healthy),
            Some(AlertKind::TooLow) => Style::default().fg(self.too_low).add_modifier(Modifier::BOLD),
            Some(AlertKind::TooHigh) => {
                Style::default().fg(self.too_high).add_modifier(Modifier::BOLD)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_modes() {
        assert_eq!(Theme::resolve(ThemeMode::Light), Theme::day());
        assert_eq!(Theme::resolve(ThemeMode::Dark), Theme::night());
        assert_eq!(Theme::for_phase(DayPhase::Night), Theme::night());
    }

    #[test]
    fn test_status_colors() {
        let theme = Theme::day();
        assert_eq!(theme.status_style(None).fg, Some(theme.healthy));
        assert_eq!(theme.status_style(Some(AlertKind::TooHigh)).fg, Some(theme.too_high));
        assert_eq!(theme.status_style(Some(AlertKind::TooLow)).fg, Some(theme.too_low));
    }
}
