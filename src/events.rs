use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::App;
use crate::data::Metric;

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.date_input.is_some() {
        handle_date_input(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        KeyCode::Char('?') => app.toggle_help(),

        // Series visibility
        KeyCode::Char('1') => app.toggle_metric(Metric::Temperature),
        KeyCode::Char('2') => app.toggle_metric(Metric::Moisture),
        KeyCode::Char('3') => app.toggle_metric(Metric::Pressure),
        KeyCode::Char('s') => app.toggle_stats(),

        // History window
        KeyCode::Char('l') if key.modifiers.is_empty() => app.toggle_rolling(),
        KeyCode::Char('d') => app.open_date_input(),
        KeyCode::Char('c') => app.clear_range(),
        KeyCode::Char('r') => app.refresh(),

        // Viewport
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') => app.zoom_out(),
        KeyCode::Left => app.pan_left(),
        KeyCode::Right => app.pan_right(),
        KeyCode::Char('0') => app.reset_viewport(),

        // Export
        KeyCode::Char('e') => {
            let path = app.export.path.clone();
            match app.export_csv(&path) {
                Ok(count) => {
                    app.set_status_message(format!(
                        "Exported {} rows to {}",
                        count,
                        path.display()
                    ));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Handle key input while the date range overlay is open
fn handle_date_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_date_input(),
        KeyCode::Esc => app.cancel_date_input(),
        _ => {
            let Some(input) = app.date_input.as_mut() else {
                return;
            };
            match key.code {
                KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                    input.switch_field()
                }
                KeyCode::Backspace => input.pop(),
                KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '-' | ':' | ' ') => {
                    input.push(c)
                }
                _ => {}
            }
        }
    }
}
