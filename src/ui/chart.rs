//! History chart.
//!
//! Temperature and moisture share the primary chart; pressure, on a very
//! different scale, gets a secondary chart below it. Only the slots inside
//! the viewport are drawn.

use std::ops::Range;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::Axis as ChartAxis;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Sensor Data History ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if app.chart.is_empty() || app.chart.datasets.is_empty() {
        let message = if app.chart.is_empty() {
            "No readings in this window"
        } else {
            "All series hidden (1/2/3 to show)"
        };
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let range = app.viewport.range(app.chart.len());
    let axes: Vec<ChartAxis> = [ChartAxis::Primary, ChartAxis::Secondary]
        .into_iter()
        .filter(|axis| app.chart.on_axis(*axis).next().is_some())
        .collect();

    let constraints = match axes.len() {
        1 => vec![Constraint::Min(0)],
        _ => vec![Constraint::Percentage(62), Constraint::Percentage(38)],
    };
    let areas = Layout::vertical(constraints).split(inner);

    for (axis, chunk) in axes.iter().zip(areas.iter()) {
        render_axis(frame, app, *axis, range.clone(), *chunk);
    }
}

fn render_axis(frame: &mut Frame, app: &App, axis: ChartAxis, range: Range<usize>, area: Rect) {
    let series: Vec<(&'static str, Color, Vec<(f64, f64)>)> = app
        .chart
        .on_axis(axis)
        .map(|d| {
            let (r, g, b) = d.color;
            (d.label, Color::Rgb(r, g, b), d.points(range.clone()))
        })
        .collect();

    let datasets: Vec<Dataset> = series
        .iter()
        .map(|(label, color, points)| {
            Dataset::default()
                .name(*label)
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(*color))
                .data(points)
        })
        .collect();

    let (lo, hi) = padded(app.chart.bounds(axis, range.clone()));
    let x_bounds = [range.start as f64, range.end.saturating_sub(1).max(range.start) as f64];

    let label_style = Style::default().add_modifier(Modifier::DIM);
    let x_labels: Vec<Span> = x_label_slots(range.clone())
        .into_iter()
        .filter_map(|i| app.chart.labels.get(i))
        .map(|l| Span::styled(l.clone(), label_style))
        .collect();
    let y_labels = vec![
        Span::styled(format!("{:.1}", lo), label_style),
        Span::styled(format!("{:.1}", (lo + hi) / 2.0), label_style),
        Span::styled(format!("{:.1}", hi), label_style),
    ];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(app.theme.border))
                .bounds(x_bounds)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(app.theme.border))
                .bounds([lo, hi])
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

/// Add headroom around the data so lines do not sit on the frame.
fn padded(bounds: Option<(f64, f64)>) -> (f64, f64) {
    match bounds {
        None => (0.0, 1.0),
        Some((lo, hi)) if (hi - lo).abs() < f64::EPSILON => (lo - 1.0, hi + 1.0),
        Some((lo, hi)) => {
            let pad = (hi - lo) * 0.05;
            (lo - pad, hi + pad)
        }
    }
}

/// First, middle and last slot of the visible range.
fn x_label_slots(range: Range<usize>) -> Vec<usize> {
    match range.len() {
        0 => Vec::new(),
        1 => vec![range.start],
        2 => vec![range.start, range.end - 1],
        n => vec![range.start, range.start + n / 2, range.end - 1],
    }
}
