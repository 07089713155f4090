use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{error, info};

use subline::app::{App, Settings};
use subline::logging::setup_logging;
use subline::search::SearchOptions;
use subline::ui::ui;

/// Subline: terminal subtitle editor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing JSON transcripts and SRT files
    #[arg(short, long, default_value = "transcripts")]
    input_dir: PathBuf,

    /// Transcript to open first
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Directory for SRT and JSON exports
    #[arg(short, long, default_value = "exports")]
    export_dir: PathBuf,

    /// Log file; the terminal is taken by the interface
    #[arg(long, default_value = "subline.log")]
    log_file: PathBuf,

    /// Log level used when SUBLINE_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Start with case-sensitive search
    #[arg(short, long)]
    case_sensitive: bool,

    /// Start with whole-word search
    #[arg(short, long)]
    whole_word: bool,

    /// Prefix exported SRT cues with speaker names
    #[arg(short, long)]
    speaker_labels: bool,
}

fn run_app(settings: Settings) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(settings).and_then(|mut app| {
        app.on_resize(terminal.size()?);
        while !app.should_quit() {
            terminal.draw(|f| ui(f, &app))?;
            if event::poll(Duration::from_millis(250))? {
                app.handle_event(event::read()?);
            }
        }
        Ok(())
    });

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        println!("Directory '{}' does not exist. Creating it...", dir.display());
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_file, &args.log_level)?;

    ensure_dir(&args.input_dir)?;
    ensure_dir(&args.export_dir)?;

    let settings = Settings {
        input_dir: args.input_dir,
        export_dir: args.export_dir,
        file: args.file,
        search: SearchOptions {
            case_sensitive: args.case_sensitive,
            whole_word: args.whole_word,
        },
        speaker_labels: args.speaker_labels,
    };
    info!(?settings, "starting");

    if let Err(err) = run_app(settings) {
        error!(error = %err, "exited with error");
        eprintln!("Error: {}", err);
    }

    Ok(())
}
