//! Application layer - use cases and orchestration.
//!
//! This layer contains the timer engine, statistics, persistence
//! synchronization and output formatting.

pub mod board;
pub mod formatter;
pub mod session;
pub mod statistics;
pub mod sync_service;

pub use board::{Board, Direction};
pub use formatter::{
    format_board_table, format_chronometer_stats, format_chronometers_csv, format_document_json,
    format_live_line, format_sessions_csv, format_totals, ExportFormat,
};
pub use session::{run_watch, WatchTiming};
pub use sync_service::{Mode, SyncService};
