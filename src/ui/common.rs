//! Common UI components shared across panels.
//!
//! This module contains the header bar, status bar, help overlay and the
//! date range overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, DateField, HINT};
use crate::subscribe::ConnectionState;

/// Render the header bar with connection state and the active window.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let state = (app.connection(), app.connection_error());
    let (status_icon, status_text, status_style) = match state {
        (ConnectionState::Idle, _) => (
            "○",
            "IDLE".to_string(),
            Style::default().add_modifier(Modifier::DIM),
        ),
        (_, Some(err)) => (
            "●",
            format!("CONNECTION LOST: {}", err),
            Style::default().fg(app.theme.too_high).add_modifier(Modifier::BOLD),
        ),
        _ => ("●", "LIVE".to_string(), Style::default().fg(app.theme.healthy)),
    };

    let updated = match app.last_update {
        Some(at) => format!("updated {}s ago", at.elapsed().as_secs()),
        None => "waiting for first reading".to_string(),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {} ", status_icon), status_style),
        Span::styled("PLANTPULSE ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(status_text, status_style),
        Span::raw(" │ "),
        Span::styled(app.window_description(), Style::default().fg(app.theme.highlight)),
        Span::raw(" │ "),
        Span::raw(app.phase.symbol()),
        Span::raw(" │ "),
        Span::styled(updated, Style::default().add_modifier(Modifier::DIM)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows the feed, the chart viewport and the available controls, or a
/// temporary status message.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.date_input.is_some() {
        "Tab:switch field Enter:apply Esc:cancel"
    } else {
        "1/2/3:series l:rolling d:dates r:refresh e:export +/-:zoom ←/→:pan ?:help q:quit"
    };

    let viewport = if app.viewport.is_reset() {
        String::new()
    } else {
        format!(" | zoom x{} (0:reset)", app.viewport.zoom())
    };

    let status = format!(
        " {} | {} readings{} | {}",
        app.source_description(),
        app.rows().len(),
        viewport,
        controls
    );

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Center a `width` x `height` box inside `area`, shrinking it to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Render the help overlay with keyboard shortcuts.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Chart"),
        Line::from("  1 2 3       Toggle temperature/moisture/pressure"),
        Line::from("  + / -       Zoom in / out"),
        Line::from("  ←/→         Pan older / newer"),
        Line::from("  0           Reset zoom and pan"),
        Line::from("  s           Toggle statistics"),
        Line::from(""),
        section(" History window"),
        Line::from("  l           Toggle rolling window"),
        Line::from("  d           Enter date range"),
        Line::from("  c           Clear date range"),
        Line::from("  r           Refresh (re-anchor window)"),
        Line::from(""),
        section(" General"),
        Line::from("  e           Export CSV"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let help_area = centered(area, 54, 22);
    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(help_text).block(block), help_area);
}

/// Render the date range input overlay.
pub fn render_date_input(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref input) = app.date_input else {
        return;
    };

    let field = |label: &'static str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if active { "▏" } else { "" };
        Line::from(vec![
            Span::styled(format!(" {:<7}", label), style),
            Span::styled(format!("{}{}", value, cursor), style),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field("Start", &input.start, input.field == DateField::Start),
        field("End", &input.end, input.field == DateField::End),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Local time, {}. Leave both empty to clear.", HINT),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    if let Some(ref err) = input.error {
        lines.push(Line::from(Span::styled(
            format!(" {}", err),
            Style::default().fg(app.theme.too_high),
        )));
    }

    let block = Block::default()
        .title(" Date range ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let input_area = centered(area, 56, 9);
    frame.render_widget(Clear, input_area);
    frame.render_widget(Paragraph::new(lines).block(block), input_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let inner = centered(area, 50, 10);
        assert_eq!(inner, Rect::new(25, 15, 50, 10));

        let small = centered(Rect::new(0, 0, 20, 6), 50, 10);
        assert!(small.width <= 16 && small.height <= 4);
    }
}
