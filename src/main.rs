use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use plantpulse::app::App;
use plantpulse::config::Settings;
use plantpulse::data::duration::parse_duration;
use plantpulse::data::Visibility;
use plantpulse::events;
use plantpulse::export::{encode_csv, write_csv};
use plantpulse::feed::{Feed, FileFeed, SimulatedFeed, SimulationSettings, StreamFeed};
use plantpulse::store::MemoryStore;
use plantpulse::subscribe::{HistorySubscriber, HistoryWindow};
use plantpulse::ui::{self, ThemeMode};

/// UI redraw and snapshot polling cadence.
const TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "plantpulse")]
#[command(about = "Terminal dashboard for live plant sensor readings, alerts and history")]
struct Args {
    /// Settings file (TOML). Environment variables PLANTPULSE__* override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Readings file to watch (JSON array or one reading per line)
    #[arg(short, long, default_value = "readings.json", conflicts_with_all = ["connect", "simulate"])]
    file: PathBuf,

    /// Connect to a TCP endpoint streaming readings (host:port)
    #[arg(short, long, conflicts_with_all = ["file", "simulate"])]
    connect: Option<String>,

    /// Generate simulated readings instead of reading real sensors
    #[arg(long, conflicts_with_all = ["file", "connect"])]
    simulate: bool,

    /// Seed for --simulate, for reproducible runs
    #[arg(long, requires = "simulate")]
    seed: Option<u64>,

    /// Interval between simulated readings (e.g. "2s")
    #[arg(long, default_value = "2s", requires = "simulate")]
    sim_interval: String,

    /// File refresh interval (e.g. "1s", "500ms"); overrides the settings file
    #[arg(short, long)]
    refresh: Option<String>,

    /// Export the history window to CSV and exit
    #[arg(short, long, conflicts_with_all = ["connect", "simulate"])]
    export: Option<PathBuf>,

    /// With --export, include every reading instead of the rolling window
    #[arg(long, requires = "export")]
    all: bool,

    /// Write logs to this file (RUST_LOG controls the level)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Palette selection; overrides the settings file
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // The TUI owns stdout, so logs only go to a file when asked for
    if let Some(ref path) = args.log_file {
        init_logging(path)?;
    }

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(theme) = args.theme {
        settings.theme = theme;
    }
    if let Some(ref refresh) = args.refresh {
        settings.dashboard.refresh_interval = refresh.clone();
    }
    let refresh = settings.refresh_interval()?;

    let store =
        MemoryStore::new(&settings.store.collection).with_retention(settings.store.max_readings);
    info!(store = ?settings.store, "Starting plantpulse");

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        return export_to_file(&args.file, export_path, args.all, store, &settings);
    }

    // Handle TCP connection mode
    if let Some(ref addr) = args.connect {
        return run_with_tcp(addr, store, &settings);
    }

    if args.simulate {
        let simulation = SimulationSettings {
            interval: parse_duration(&args.sim_interval)?,
            ..SimulationSettings::default()
        };
        return run_with_simulator(store, &settings, simulation, args.seed);
    }

    // Default: file-based mode
    run_with_file(&args.file, store, &settings, refresh)
}

fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,plantpulse=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

/// Run with a file-based feed
fn run_with_file(
    path: &Path,
    store: MemoryStore,
    settings: &Settings,
    refresh: Duration,
) -> Result<()> {
    let feed = Box::new(FileFeed::new(path, store.clone()));
    run_tui(store, feed, settings, refresh)
}

/// Run with a TCP stream feed
fn run_with_tcp(addr: &str, store: MemoryStore, settings: &Settings) -> Result<()> {
    // Build a tokio runtime for the TCP connection
    let rt = tokio::runtime::Runtime::new()?;

    println!("Connecting to {}...", addr);
    let feed = rt.block_on(StreamFeed::connect(addr, store.clone()))?;
    println!("Connected!");

    // The reader task writes into the store; nothing to poll
    let result = run_tui(store, Box::new(feed), settings, TICK);
    rt.shutdown_background();
    result
}

/// Run with simulated readings
fn run_with_simulator(
    store: MemoryStore,
    settings: &Settings,
    simulation: SimulationSettings,
    seed: Option<u64>,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    let feed = {
        let _guard = rt.enter();
        match seed {
            Some(seed) => SimulatedFeed::spawn_seeded(store.clone(), simulation, seed),
            None => SimulatedFeed::spawn(store.clone(), simulation),
        }
    };

    let result = run_tui(store, Box::new(feed), settings, TICK);
    rt.shutdown_background();
    result
}

/// Run the TUI with the given store and feed
fn run_tui(
    store: MemoryStore,
    feed: Box<dyn Feed>,
    settings: &Settings,
    refresh_interval: Duration,
) -> Result<()> {
    let mut app = App::new(Box::new(store), feed, settings)?;
    app.poll_feed();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Run the main loop
    let result = run_app(&mut terminal, &mut app, refresh_interval);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 72;
    const MIN_HEIGHT: u16 = 20;

    while app.running {
        app.tick();

        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let top = (area.height / 2).saturating_sub(2);
                let centered = ratatui::layout::Rect::new(0, top, area.width, 5).intersection(area);
                frame.render_widget(paragraph, centered);
                return;
            }

            let rows = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Min(12),   // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, rows[0]);

            let columns =
                Layout::horizontal([Constraint::Length(34), Constraint::Min(30)]).split(rows[1]);
            ui::overview::render(frame, app, columns[0]);

            if app.show_stats {
                let right =
                    Layout::vertical([Constraint::Min(8), Constraint::Length(6)]).split(columns[1]);
                ui::chart::render(frame, app, right[0]);
                ui::stats::render(frame, app, right[1]);
            } else {
                ui::chart::render(frame, app, columns[1]);
            }

            ui::common::render_status_bar(frame, app, rows[2]);

            if app.date_input.is_some() {
                ui::common::render_date_input(frame, app, area);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        if let Some(Event::Key(key)) = events::poll_event(TICK)? {
            events::handle_key_event(app, key);
        }

        // Synchronous feeds (the file feed) are polled on their own cadence
        if last_refresh.elapsed() >= refresh_interval {
            app.poll_feed();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}

/// Load the readings file once and write the history window as CSV
fn export_to_file(
    readings_path: &Path,
    export_path: &Path,
    all: bool,
    store: MemoryStore,
    settings: &Settings,
) -> Result<()> {
    let mut feed = FileFeed::new(readings_path, store.clone());
    if !feed.poll() {
        bail!(
            "Could not load {}: {}",
            readings_path.display(),
            feed.error().unwrap_or_else(|| "no data".to_string())
        );
    }

    let window = if all {
        HistoryWindow::All
    } else {
        HistoryWindow::Rolling(settings.rolling_window()?)
    };

    let mut history = HistorySubscriber::new();
    history.set_window(&store, window)?;
    history.poll();

    let rows = history.rows();
    let csv = encode_csv(rows, &Visibility::default(), &settings.export.timestamp_format);
    write_csv(export_path, &csv)?;

    println!(
        "Exported {} readings ({}) to: {}",
        rows.len(),
        window.describe(),
        export_path.display()
    );
    history.close();
    Ok(())
}
