// main.rs
use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::Backend, backend::CrosstermBackend};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, mpsc::RecvTimeoutError};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cropdash::app::App;
use cropdash::cache::DataCache;
use cropdash::chart::Chart;
use cropdash::config::{Cli, Commands, ExportArgs};
use cropdash::data::CropTable;
use cropdash::event::{Event, EventHandler};
use cropdash::filter::{self, FilterSelection};
use cropdash::geo::GeoBoundary;
use cropdash::{dashboard, render, ui};

const TICK_RATE: Duration = Duration::from_millis(250);

/// The dashboard owns the terminal, so interactive sessions log to a file.
/// Headless exports log to stderr.
fn init_tracing(cli: &Cli) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    match cli.command {
        Some(Commands::Export(_)) => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
        None => {
            let file = File::create(&cli.log_file)
                .with_context(|| format!("creating log file {}", cli.log_file.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    // Both inputs load up front; a bad file ends the run before the UI starts.
    let cache = DataCache::new(cli.sources()?);
    let table = cache.table()?;
    let boundary = cache.boundary()?;
    info!(
        rows = table.len(),
        shapes = boundary.shapes().len(),
        "inputs loaded"
    );

    match &cli.command {
        Some(Commands::Export(args)) => export(args, &table, &boundary, &cli.output_dir),
        None => {
            let selection = FilterSelection::defaults(&table);
            let app = App::new(table, boundary, selection, cli.output_dir.clone());
            run_tui(app)
        }
    }
}

fn export(
    args: &ExportArgs,
    table: &CropTable,
    boundary: &Arc<GeoBoundary>,
    output_dir: &Path,
) -> Result<()> {
    let base = if args.defaults {
        FilterSelection::defaults(table)
    } else {
        FilterSelection::default()
    };
    let selection = args.selection(base);
    let view = dashboard::build_dashboard(table, boundary, &selection);
    if view.matched_rows == 0 {
        warn!("no rows match the requested filters; charts will be placeholders");
    }
    let mut written = render::export_all(&view.charts, output_dir)?;

    if let Some(state) = &args.drill_state {
        if !filter::state_options(table).contains(state) {
            warn!(state = %state, "drill-down state does not occur in the data");
        }
    }
    let map = dashboard::build_map_view(table, boundary, args.drill_state.as_deref());
    let map_charts: Vec<Chart> = map.charts().into_iter().cloned().collect();
    written.extend(render::export_all(&map_charts, output_dir)?);

    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_tui(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_loop(&mut terminal, &mut app);

    // Restore the terminal even when the loop failed.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let events = EventHandler::new(TICK_RATE);
    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, app))?;
        match events.next(TICK_RATE * 4) {
            Ok(Event::Input(key)) => app.handle_key(key),
            Ok(Event::Tick) | Ok(Event::Resize) => {}
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("terminal event stream closed"),
        }
    }
    info!("dashboard closed");
    Ok(())
}
