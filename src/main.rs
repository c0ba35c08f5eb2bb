//! Multi-Chronometer - several named stopwatches stored in one note document.
//!
//! Every chronometer can be started, paused, reset (which records a session),
//! renamed, recolored and reordered. The board is saved as JSON into a note
//! document; when the note cannot be reached the board lives in a local
//! `SQLite` store instead.
//!
//! QUICK START:
//!   chrono-board add Writing            # Create a chronometer
//!   chrono-board start 1                # Start it (by position, id or name)
//!   chrono-board watch                  # Live view with autosave
//!   chrono-board reset writing --yes    # Record a session and zero it
//!   chrono-board stats 1 --expand       # Session history by day

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_board_table, format_chronometer_stats, format_chronometers_csv, format_document_json,
    format_live_line, format_sessions_csv, format_totals, run_watch, Board, Direction,
    ExportFormat, Mode, SyncService, WatchTiming,
};
use cli::{Cli, Commands};
use domain::{format_hms, AppConfig, AppError, Clock, Settings, SystemClock};
use infrastructure::{
    config_file_path, ensure_config_exists, load_config, save_config, LocalStorage,
    NoteFileStore,
};

type Service = SyncService<NoteFileStore>;

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    if let Err(e) = ensure_config_exists() {
        tracing::warn!(error = %e, "Could not create default configuration");
    }
    let config = load_config()?;

    if !cli.command.needs_board() {
        return match cli.command {
            Commands::Config {
                autosave_secs,
                init_timeout_ms,
                poll_interval_ms,
                refresh_ms,
            } => cmd_config(config, autosave_secs, init_timeout_ms, poll_interval_ms, refresh_ms),
            _ => cmd_paths(&config, cli.document.as_deref()),
        };
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::io("Failed to start async runtime", e))?;

    let result = runtime.block_on(async move {
        let mut service = open_service(&cli, &config).await?;
        if service.mode() == Mode::Standalone && !cli.standalone {
            eprintln!(
                "{} note unavailable, using local storage",
                "standalone:".yellow()
            );
        }

        match cli.command {
            Commands::Watch => cmd_watch(&mut service, &config).await,
            command => execute(command, &mut service),
        }
    });

    // A host that never answered may still hold a blocking thread.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

/// Connect to the note document, or go straight to local storage.
async fn open_service(cli: &Cli, config: &AppConfig) -> domain::Result<Service> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let local_path = config.local_store_path();

    if cli.standalone {
        let storage = LocalStorage::open(&local_path)?;
        return Ok(SyncService::standalone(storage, clock));
    }

    let document = cli
        .document
        .clone()
        .unwrap_or_else(|| config.document_path());

    SyncService::connect(
        NoteFileStore::new(document),
        move || LocalStorage::open(&local_path),
        config.init_timeout(),
        clock,
    )
    .await
}

/// Dispatch a board command.
fn execute(command: Commands, service: &mut Service) -> domain::Result<()> {
    match command {
        Commands::List => cmd_list(service),
        Commands::Add { name } => cmd_add(service, name.as_deref()),
        Commands::Start { timer } => {
            let id = service.board().resolve(&timer)?;
            service.mutate(|b| b.start(&id))?;
            println!("{} Started {}", "▶".green().bold(), timer_name(service.board(), &id));
            Ok(())
        }
        Commands::Pause { timer } => {
            let id = service.board().resolve(&timer)?;
            service.mutate(|b| b.pause(&id))?;
            print_paused(service.board(), &id);
            Ok(())
        }
        Commands::Toggle { timer } => {
            let id = service.board().resolve(&timer)?;
            if service.mutate(|b| b.toggle(&id))? {
                println!("{} Started {}", "▶".green().bold(), timer_name(service.board(), &id));
            } else {
                print_paused(service.board(), &id);
            }
            Ok(())
        }
        Commands::Reset { timer, yes } => cmd_reset(service, &timer, yes),
        Commands::SetTime { timer, time } => {
            let id = service.board().resolve(&timer)?;
            let elapsed = service.mutate(|b| b.set_time(&id, &time))?;
            println!(
                "{} {} set to {}",
                "✓".green().bold(),
                timer_name(service.board(), &id),
                format_hms(elapsed)
            );
            Ok(())
        }
        Commands::Rename { timer, name } => {
            let id = service.board().resolve(&timer)?;
            let old = timer_name(service.board(), &id);
            if service.mutate(|b| b.rename(&id, &name))? {
                println!("{} Renamed {} → {}", "✓".green().bold(), old, name.trim().cyan());
            } else {
                println!("Name unchanged");
            }
            Ok(())
        }
        Commands::Reorder { timer, position } => {
            let id = service.board().resolve(&timer)?;
            service.mutate(|b| b.reorder(&id, position.saturating_sub(1)))?;
            print_position(service.board(), &id);
            Ok(())
        }
        Commands::Move { timer, direction } => cmd_move(service, &timer, direction),
        Commands::Color { timer, color } => {
            let id = service.board().resolve(&timer)?;
            service.mutate(|b| b.set_color(&id, &color))?;
            println!(
                "{} {} is now {}",
                "✓".green().bold(),
                timer_name(service.board(), &id),
                color.to_lowercase()
            );
            Ok(())
        }
        Commands::Delete { timer } => {
            let id = service.board().resolve(&timer)?;
            let removed = service.mutate(|b| b.delete(&id))?;
            println!(
                "{} Deleted {} ({} sessions)",
                "✓".green().bold(),
                removed.name,
                removed.stats.session_count
            );
            Ok(())
        }
        Commands::Stats { timer, expand } => cmd_stats(service.board(), timer.as_deref(), expand),
        Commands::Export { format, output } => cmd_export(service.board(), format, output.as_deref()),
        Commands::Settings {
            hide_statistics,
            skip_reset_confirmation,
            expand_all_stats,
            read_only_mode,
            hide_statistics_buttons,
        } => {
            let current = *service.board().settings();
            let updated = Settings {
                hide_statistics: hide_statistics.unwrap_or(current.hide_statistics),
                skip_reset_confirmation: skip_reset_confirmation
                    .unwrap_or(current.skip_reset_confirmation),
                expand_all_stats: expand_all_stats.unwrap_or(current.expand_all_stats),
                read_only_mode: read_only_mode.unwrap_or(current.read_only_mode),
                hide_statistics_buttons: hide_statistics_buttons
                    .unwrap_or(current.hide_statistics_buttons),
            };
            if service.update_settings(updated) {
                println!("{} Settings saved", "✓".green().bold());
            }
            print_settings(service.board().settings());
            Ok(())
        }
        Commands::Watch | Commands::Paths | Commands::Config { .. } => Ok(()),
    }
}

/// List chronometers command.
fn cmd_list(service: &Service) -> domain::Result<()> {
    let board = service.board();

    if board.is_empty() {
        println!("No chronometers yet. Add one with: chrono-board add <name>");
        return Ok(());
    }

    println!(
        "{}",
        format_board_table(board.chronometers(), board.settings(), board.now())
    );

    if !board.settings().hide_statistics {
        println!();
        println!("{}", format_totals(board.chronometers()));
    }
    if board.settings().read_only_mode {
        println!("{}", "(read-only)".dimmed());
    }

    Ok(())
}

fn cmd_add(service: &mut Service, name: Option<&str>) -> domain::Result<()> {
    let id = service.mutate(|b| b.add(name))?;
    let board = service.board();
    let position = board.get(&id)?.order + 1;
    println!(
        "{} Added {} at #{} ({})",
        "✓".green().bold(),
        timer_name(board, &id).cyan(),
        position,
        &id[..8.min(id.len())]
    );
    Ok(())
}

/// Reset command, asking first unless told not to.
fn cmd_reset(service: &mut Service, timer: &str, yes: bool) -> domain::Result<()> {
    let id = service.board().resolve(timer)?;
    let name = timer_name(service.board(), &id);

    if reset_needs_prompt(service.board().settings(), yes)?
        && !confirm(&format!("Reset \"{name}\"?"))?
    {
        println!("Cancelled");
        return Ok(());
    }

    match service.mutate(|b| b.reset(&id))? {
        Some(session) => println!(
            "{} Reset {} and recorded a {} session",
            "✓".green().bold(),
            name.cyan(),
            format_hms(session.duration).yellow()
        ),
        None => println!("{} Reset {}", "✓".green().bold(), name.cyan()),
    }
    Ok(())
}

/// Whether `reset` should ask first. Read-only boards fail before asking.
fn reset_needs_prompt(settings: &Settings, yes: bool) -> domain::Result<bool> {
    if settings.read_only_mode {
        return Err(AppError::ReadOnly);
    }
    Ok(!(yes || settings.skip_reset_confirmation))
}

fn cmd_move(service: &mut Service, timer: &str, direction: Direction) -> domain::Result<()> {
    let id = service.board().resolve(timer)?;
    if service.mutate(|b| b.move_adjacent(&id, direction))? {
        print_position(service.board(), &id);
    } else {
        println!("{} is already at the edge", timer_name(service.board(), &id));
    }
    Ok(())
}

/// Show statistics command.
fn cmd_stats(board: &Board, timer: Option<&str>, expand: bool) -> domain::Result<()> {
    let expand = expand || board.settings().expand_all_stats;
    let now = board.now();

    if let Some(query) = timer {
        let id = board.resolve(query)?;
        print!("{}", format_chronometer_stats(board.get(&id)?, now, expand));
        return Ok(());
    }

    for c in board.chronometers() {
        println!("{}", format_chronometer_stats(c, now, expand));
    }
    println!("{}", format_totals(board.chronometers()));

    Ok(())
}

/// Export the board to file or stdout.
fn cmd_export(board: &Board, format: ExportFormat, output: Option<&Path>) -> domain::Result<()> {
    let content = match format {
        ExportFormat::Json => {
            format_document_json(&board.to_document()).map_err(AppError::json_parse)?
        }
        ExportFormat::Csv => format_chronometers_csv(board.chronometers(), board.now()),
        ExportFormat::SessionsCsv => format_sessions_csv(board.chronometers()),
    };

    match output {
        Some(path) => {
            let path = if path.extension().is_none() {
                path.with_extension(format.extension())
            } else {
                path.to_path_buf()
            };
            std::fs::write(&path, content)
                .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;
            println!(
                "{} Exported {} chronometers to {}",
                "✓".green().bold(),
                board.len(),
                path.display()
            );
        }
        None => println!("{content}"),
    }

    Ok(())
}

/// Live view until Ctrl-C.
async fn cmd_watch(service: &mut Service, config: &AppConfig) -> domain::Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    let report = run_watch(
        service,
        WatchTiming::from_config(config),
        shutdown,
        live_frame,
        draw_frame,
    )
    .await;

    println!();
    tracing::info!(frames = report.frames, "Watch closed");
    Ok(())
}

fn draw_frame(frame: &str) {
    use std::io::Write;

    let mut stdout = std::io::stdout().lock();
    if write!(stdout, "\x1B[2J\x1B[H{frame}")
        .and_then(|()| stdout.flush())
        .is_err()
    {
        tracing::debug!("Failed to draw frame");
    }
}

fn live_frame(board: &Board) -> String {
    let now = board.now();
    let mut out = format!("{}\n\n", "⏱  Multi-Chronometer (Ctrl-C to quit)".bold());

    if board.is_empty() {
        out.push_str("No chronometers yet.\n");
    }
    for c in board.chronometers() {
        out.push_str(&format!("  {:>2}. {}\n", c.order + 1, format_live_line(c, now)));
    }
    if !board.settings().hide_statistics {
        out.push('\n');
        out.push_str(&format_totals(board.chronometers()));
        out.push('\n');
    }

    out
}

/// Show file paths command.
fn cmd_paths(config: &AppConfig, document: Option<&Path>) -> domain::Result<()> {
    let document: PathBuf = document.map_or_else(|| config.document_path(), Path::to_path_buf);
    let local = config.local_store_path();

    println!("{}", "📂 Multi-Chronometer Paths".bold());
    println!();
    println!("  [{}] {}", "config".green(), config_file_path().display());
    let note_state = if document.exists() {
        "exists"
    } else {
        "not created yet"
    };
    println!(
        "  [{}] {} ({})",
        "note".blue(),
        document.display(),
        note_state
    );

    let size = if local.exists() {
        LocalStorage::open(&local)?.get_storage_size()?
    } else {
        0
    };
    println!(
        "  [{}] {} ({} bytes)",
        "local".yellow(),
        local.display(),
        size
    );

    Ok(())
}

/// Show or update the configuration file.
fn cmd_config(
    mut config: AppConfig,
    autosave_secs: Option<u64>,
    init_timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    refresh_ms: Option<u64>,
) -> domain::Result<()> {
    let changed = autosave_secs.is_some()
        || init_timeout_ms.is_some()
        || poll_interval_ms.is_some()
        || refresh_ms.is_some();

    if let Some(v) = autosave_secs {
        config.autosave.interval_secs = v;
    }
    if let Some(v) = init_timeout_ms {
        config.host.init_timeout_ms = v;
    }
    if let Some(v) = poll_interval_ms {
        config.host.poll_interval_ms = v;
    }
    if let Some(v) = refresh_ms {
        config.display.refresh_ms = v;
    }

    if changed {
        save_config(&config)?;
        println!("{} Saved {}", "✓".green().bold(), config_file_path().display());
    }

    let text = toml::to_string_pretty(&config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;
    println!("{text}");

    Ok(())
}

fn timer_name(board: &Board, id: &str) -> String {
    board
        .get(id)
        .map_or_else(|_| id.to_string(), |c| c.name.clone())
}

fn print_paused(board: &Board, id: &str) {
    let time = board.display_time(id).unwrap_or_default();
    println!(
        "{} Paused {} at {}",
        "⏸".yellow().bold(),
        timer_name(board, id),
        format_hms(time)
    );
}

fn print_position(board: &Board, id: &str) {
    if let Ok(c) = board.get(id) {
        println!("{} {} is now #{}", "✓".green().bold(), c.name, c.order + 1);
    }
}

fn print_settings(settings: &Settings) {
    let flag = |on: bool| if on { "on".green() } else { "off".dimmed() };
    println!("  hide-statistics:          {}", flag(settings.hide_statistics));
    println!(
        "  skip-reset-confirmation:  {}",
        flag(settings.skip_reset_confirmation)
    );
    println!("  expand-all-stats:         {}", flag(settings.expand_all_stats));
    println!("  read-only-mode:           {}", flag(settings.read_only_mode));
    println!(
        "  hide-statistics-buttons:  {}",
        flag(settings.hide_statistics_buttons)
    );
}

fn confirm(prompt: &str) -> domain::Result<bool> {
    use std::io::Write;

    print!("{prompt} [y/N] ");
    std::io::stdout()
        .flush()
        .map_err(|e| AppError::io("Failed to flush stdout", e))?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .map_err(|e| AppError::io("Failed to read answer", e))?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
