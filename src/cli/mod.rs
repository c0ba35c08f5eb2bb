//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::{Direction, ExportFormat};

/// Multi-Chronometer - several named stopwatches kept in one note document.
///
/// Timers are addressed by position (1-based), id, id prefix or name:
/// chrono-board add Writing | start 1 | pause writing | stats 1 --expand
#[derive(Parser, Debug)]
#[command(name = "chrono-board")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Note document to use instead of the configured one.
    #[arg(long, global = true)]
    pub document: Option<PathBuf>,

    /// Skip the note document and use local storage only.
    #[arg(long, global = true)]
    pub standalone: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all chronometers (summary table).
    List,

    /// Add a chronometer.
    Add {
        /// Name (defaults to "Timer N").
        name: Option<String>,
    },

    /// Start a paused chronometer.
    Start {
        /// Position, id or name.
        timer: String,
    },

    /// Pause a running chronometer.
    Pause {
        /// Position, id or name.
        timer: String,
    },

    /// Start if paused, pause if running.
    Toggle {
        /// Position, id or name.
        timer: String,
    },

    /// Reset to zero, recording the elapsed time as a session.
    Reset {
        /// Position, id or name.
        timer: String,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Set the elapsed time of a paused chronometer.
    SetTime {
        /// Position, id or name.
        timer: String,

        /// New time as HH:MM:SS.
        time: String,
    },

    /// Rename a chronometer.
    Rename {
        /// Position, id or name.
        timer: String,

        /// New name.
        name: String,
    },

    /// Move a chronometer to a 1-based position.
    Reorder {
        /// Position, id or name.
        timer: String,

        /// Target position (clamped to the board).
        position: usize,
    },

    /// Move a chronometer one slot up or down.
    Move {
        /// Position, id or name.
        timer: String,

        /// Direction: up or down.
        direction: Direction,
    },

    /// Set a chronometer's color.
    Color {
        /// Position, id or name.
        timer: String,

        /// blue, green, red, orange, purple, pink, yellow, teal or gray.
        color: String,
    },

    /// Delete a chronometer and its history.
    Delete {
        /// Position, id or name.
        timer: String,
    },

    /// Show statistics for one chronometer or the whole board.
    Stats {
        /// Position, id or name (all when omitted).
        timer: Option<String>,

        /// Include the session history grouped by day.
        #[arg(short, long)]
        expand: bool,
    },

    /// Export the board to a file or stdout.
    Export {
        /// Output format: json, csv or sessions-csv.
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Output file path (stdout if not specified).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change display settings.
    Settings {
        #[arg(long)]
        hide_statistics: Option<bool>,

        #[arg(long)]
        skip_reset_confirmation: Option<bool>,

        #[arg(long)]
        expand_all_stats: Option<bool>,

        #[arg(long)]
        read_only_mode: Option<bool>,

        #[arg(long)]
        hide_statistics_buttons: Option<bool>,
    },

    /// Live view; keeps running timers autosaved until Ctrl-C.
    Watch,

    /// Show the files being used.
    Paths,

    /// Show or change the configuration file.
    Config {
        /// Seconds between autosave snapshots.
        #[arg(long)]
        autosave_secs: Option<u64>,

        /// Milliseconds to wait for the note document on startup.
        #[arg(long)]
        init_timeout_ms: Option<u64>,

        /// Milliseconds between checks for external edits.
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Live display refresh in milliseconds.
        #[arg(long)]
        refresh_ms: Option<u64>,
    },
}

impl Commands {
    /// Whether the command loads the board. `paths` and `config` only touch
    /// configuration.
    #[must_use]
    pub const fn needs_board(&self) -> bool {
        !matches!(self, Self::Paths | Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reset_with_yes() {
        let cli = Cli::parse_from(["chrono-board", "reset", "2", "--yes"]);
        match cli.command {
            Commands::Reset { timer, yes } => {
                assert_eq!(timer, "2");
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["chrono-board", "list", "--standalone", "-vv"]);
        assert!(cli.standalone);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_export_format() {
        let cli = Cli::parse_from(["chrono-board", "export", "-f", "sessions-csv"]);
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: ExportFormat::SessionsCsv,
                output: None
            }
        ));
        assert!(Cli::try_parse_from(["chrono-board", "export", "-f", "xml"]).is_err());
    }

    #[test]
    fn test_parse_settings_flags() {
        let cli = Cli::parse_from(["chrono-board", "settings", "--read-only-mode", "true"]);
        match cli.command {
            Commands::Settings {
                read_only_mode,
                hide_statistics,
                ..
            } => {
                assert_eq!(read_only_mode, Some(true));
                assert_eq!(hide_statistics, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_move_direction() {
        let cli = Cli::parse_from(["chrono-board", "move", "Writing", "down"]);
        assert!(matches!(
            cli.command,
            Commands::Move {
                direction: Direction::Down,
                ..
            }
        ));
        assert!(cli.command.needs_board());
    }

    #[test]
    fn test_paths_and_config_skip_board() {
        assert!(!Cli::parse_from(["chrono-board", "paths"]).command.needs_board());
        assert!(!Cli::parse_from(["chrono-board", "config", "--autosave-secs", "10"])
            .command
            .needs_board());
    }
}
