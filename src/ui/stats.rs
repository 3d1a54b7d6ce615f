//! Statistics panel for the history window.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::app::App;
use crate::data::Metric;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec!["", "Min", "Max", "Avg"]).style(app.theme.header);

    let rows: Vec<Row> = Metric::ALL
        .iter()
        .map(|&metric| {
            let (min, max, avg) = app.stats.display(metric);
            let dim = !app.visibility.is_visible(metric);
            let style = if dim {
                Style::default().add_modifier(Modifier::DIM)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(Span::styled(metric.label(), style.add_modifier(Modifier::BOLD))),
                Cell::from(min),
                Cell::from(max),
                Cell::from(avg),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(20),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(format!(" Statistics ({} readings) ", app.stats.samples))
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    );

    frame.render_widget(table, area);
}
