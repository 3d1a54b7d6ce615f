//! Overview panel: summary cards, the plant and active alerts.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::{Card, PLANT_MAX_HEIGHT};

/// Height of one summary card including borders.
const CARD_HEIGHT: u16 = 3;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let cards = app.cards();
    let alert_height = if app.alerts.is_empty() {
        0
    } else {
        app.alerts.len() as u16 + 2
    };

    let chunks = Layout::vertical([
        Constraint::Length(CARD_HEIGHT * cards.len() as u16),
        Constraint::Min(6),
        Constraint::Length(alert_height),
    ])
    .split(area);

    let card_areas =
        Layout::vertical(vec![Constraint::Length(CARD_HEIGHT); cards.len()]).split(chunks[0]);
    for (card, card_area) in cards.iter().zip(card_areas.iter()) {
        render_card(frame, app, card, *card_area);
    }

    render_plant(frame, app, chunks[1]);

    if !app.alerts.is_empty() {
        render_alerts(frame, app, chunks[2]);
    }
}

fn render_card(frame: &mut Frame, app: &App, card: &Card, area: Rect) {
    let value_style = if card.is_default {
        Style::default().add_modifier(Modifier::DIM)
    } else {
        app.theme.status_style(card.status)
    };

    let block = Block::default()
        .title(format!(" {} ", card.title()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let line = Line::from(Span::styled(
        format!(" {}", card.text()),
        value_style.add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_plant(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Plant {} ", app.phase.symbol()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let foliage = Style::default().fg(app.theme.foliage);
    let soil = Style::default().fg(app.theme.soil);

    let mut lines: Vec<Line> = plant_rows(app.stem_height(), inner.height)
        .into_iter()
        .map(|row| Line::from(Span::styled(row, foliage)).centered())
        .collect();
    lines.push(Line::from(Span::styled("▀".repeat(inner.width as usize), soil)));

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Rows of the plant drawing from top to bottom, excluding the soil.
///
/// The stem grows with `height` (0 to 100) over the rows available above
/// the soil line; a bare pot has no rows.
pub fn plant_rows(height: f64, rows: u16) -> Vec<&'static str> {
    let available = rows.saturating_sub(1) as f64;
    let stem = ((height / PLANT_MAX_HEIGHT) * available).round() as usize;
    if stem == 0 {
        return Vec::new();
    }

    let padding = available as usize - stem;
    let mut drawing = vec![" "; padding];
    drawing.push("✿");
    for i in 1..stem {
        drawing.push(if i % 2 == 0 { "╲│ " } else { " │╱" });
    }
    drawing
}

fn render_alerts(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .alerts
        .iter()
        .map(|alert| {
            Line::from(vec![
                Span::styled(" ⚠ ", app.theme.status_style(Some(alert.kind))),
                Span::raw(alert.message.clone()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(" Alerts ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.too_high));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
