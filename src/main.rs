use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info, instrument};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use travel_desk::controller::Controller;
use travel_desk::domain::{DeskConfig, TDError};
use travel_desk::model::{Model, Status};
use travel_desk::ui::TableUI;

const LOG_ENV: &str = "TDESK_LOG";

#[derive(Parser, Debug)]
#[command(version, about = "A tui based back-office console for travel services data.")]
struct Args {
    /// Directory holding the suppliers, accounts and bookings files
    #[arg(default_value = "data")]
    data_dir: String,

    /// Log file, the level is read from TDESK_LOG
    #[arg(short, long, default_value = "tdesk.log")]
    log_file: String,

    /// Event poll interval in milliseconds
    #[arg(short = 'p', long, default_value_t = 100)]
    event_poll_time: u64,

    /// Maximum rendered width of a table column
    #[arg(short = 'w', long, default_value_t = 24)]
    max_column_width: usize,

    /// Email to pre-fill at the login prompt
    #[arg(short, long)]
    user: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args.log_file) {
        eprintln!("Error: could not open log file {}: {e}", args.log_file);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            error!("{e}");
            match e.span_trace() {
                Some(trace) => eprintln!("Error: {e}\n{trace}"),
                None => eprintln!("Error: {e}"),
            }
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(log_file: &str) -> Result<(), TDError> {
    let path = expand_path(log_file)?;
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn expand_path(raw: &str) -> Result<PathBuf, TDError> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| TDError::LoadingFailed(format!("cannot expand {raw}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[instrument(skip_all, fields(data_dir = %args.data_dir))]
fn run(args: Args) -> Result<(), TDError> {
    let config = DeskConfig::default()
        .data_dir(expand_path(&args.data_dir)?)
        .event_poll_time(args.event_poll_time)
        .max_column_width(args.max_column_width)
        .login_email(args.user);
    info!("Starting tdesk with {:?}", config);

    let (width, height) =
        ratatui::crossterm::terminal::size().map_err(|e| TDError::from(e).in_current_span())?;
    let mut model = Model::init(&config, width as usize, height as usize)
        .map_err(TDError::in_current_span)?;

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &config);
    ratatui::restore();
    result.map_err(TDError::in_current_span)
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    config: &DeskConfig,
) -> Result<(), TDError> {
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    info!("Leaving from {:?}", model.route());
    Ok(())
}
