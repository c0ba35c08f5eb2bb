//! Output formatting and export for chronometer data.
//!
//! Supports a table view, per-chronometer statistics, and JSON/CSV exports.

use colored::{Color, Colorize};
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{
    format_hms, format_relative, BoardDocument, Chronometer, ChronometerColor, Settings,
};

use super::statistics::{board_totals, group_sessions_by_date, ChronometerSummary};

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// The full persisted document.
    #[default]
    Json,
    /// One row per chronometer with derived statistics.
    Csv,
    /// One row per committed session.
    SessionsCsv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "sessions-csv" | "sessions" => Ok(Self::SessionsCsv),
            _ => Err(format!("Unknown format: {s}. Use: json, csv, sessions-csv")),
        }
    }
}

impl ExportFormat {
    /// File extension for exported files.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv | Self::SessionsCsv => "csv",
        }
    }
}

/// Terminal color for a palette entry.
const fn terminal_color(color: ChronometerColor) -> Color {
    match color {
        ChronometerColor::Blue => Color::Blue,
        ChronometerColor::Green => Color::Green,
        ChronometerColor::Red => Color::Red,
        ChronometerColor::Orange => Color::TrueColor {
            r: 255,
            g: 165,
            b: 0,
        },
        ChronometerColor::Purple => Color::Magenta,
        ChronometerColor::Pink => Color::BrightMagenta,
        ChronometerColor::Yellow => Color::Yellow,
        ChronometerColor::Teal => Color::Cyan,
        ChronometerColor::Gray => Color::BrightBlack,
    }
}

/// Formats the board as a table in display order.
pub fn format_board_table(chronometers: &[Chronometer], settings: &Settings, now: i64) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    let mut header = vec!["#", "ID", "Name", "Color", "State", "Time"];
    if !settings.hide_statistics_buttons {
        header.extend(["Sessions", "Last used"]);
    }
    table.set_header(header);

    for c in chronometers {
        let state = if c.is_running { "running" } else { "paused" };
        let mut row = vec![
            (c.order + 1).to_string(),
            short_id(&c.id).to_string(),
            truncate(&c.name, 30),
            c.palette_color().id().to_string(),
            state.to_string(),
            format_hms(c.display_time(now)),
        ];
        if !settings.hide_statistics_buttons {
            row.push(c.stats.session_count.to_string());
            row.push(
                c.stats
                    .last_used
                    .map_or_else(|| "Never".to_string(), |t| format_relative(t, now)),
            );
        }
        table.add_row(row);
    }

    table.to_string()
}

/// One line per chronometer for the live watch view.
pub fn format_live_line(c: &Chronometer, now: i64) -> String {
    let marker = if c.is_running { "▶" } else { "⏸" };
    format!(
        "{} {:>10}  {}",
        marker,
        format_hms(c.display_time(now)).bold(),
        c.name.color(terminal_color(c.palette_color()))
    )
}

/// Board-wide summary lines.
pub fn format_totals(chronometers: &[Chronometer]) -> String {
    let totals = board_totals(chronometers);
    format!(
        "{}\n  Chronometers: {}\n  Running: {}\n  Sessions: {}\n  Total recorded: {}",
        "📊 Statistics".bold(),
        totals.chronometer_count.to_string().cyan(),
        totals.running_count.to_string().green(),
        totals.session_count.to_string().cyan(),
        format_hms(totals.total_time).yellow()
    )
}

/// Detailed statistics for one chronometer, with history when `expand` is set.
pub fn format_chronometer_stats(c: &Chronometer, now: i64, expand: bool) -> String {
    let summary = ChronometerSummary::of(c);
    let mut out = String::new();

    out.push_str(&format!(
        "{} {}\n",
        "Statistics for".bold(),
        format!("\"{}\"", c.name).color(terminal_color(c.palette_color()))
    ));
    out.push_str(&format!("  Total time:  {}\n", format_hms(summary.total_time)));
    out.push_str(&format!("  Sessions:    {}\n", summary.session_count));
    out.push_str(&format!(
        "  Average:     {}\n",
        format_hms(summary.average_session)
    ));
    out.push_str(&format!(
        "  Last used:   {}\n",
        summary
            .last_used
            .map_or_else(|| "Never".to_string(), |t| format_relative(t, now))
    ));

    if summary.session_count > 0 {
        out.push_str(&format!(
            "  Longest:     {}\n  Shortest:    {}\n",
            format_hms(summary.longest_session),
            format_hms(summary.shortest_session)
        ));
    }

    if !expand {
        return out;
    }

    out.push_str(&format!("\n  {}\n", "Session history".bold()));
    let days = group_sessions_by_date(&c.stats.sessions);
    if days.is_empty() {
        out.push_str("    No completed sessions yet\n");
    }
    for day in days {
        out.push_str(&format!(
            "    {} ({})\n",
            day.date.format("%Y-%m-%d").to_string().underline(),
            format_hms(day.total())
        ));
        for s in &day.sessions {
            out.push_str(&format!(
                "      {}  {} - {}  {}\n",
                format_hms(s.duration).cyan(),
                clock_time(s.start_time),
                clock_time(s.end_time),
                format_relative(s.completed_at, now).dimmed()
            ));
        }
    }

    out
}

/// Formats the persisted document as pretty JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_document_json(document: &BoardDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}

/// One CSV row per chronometer with derived statistics.
pub fn format_chronometers_csv(chronometers: &[Chronometer], now: i64) -> String {
    let mut out = String::from(
        "id,name,color,order,elapsed,total_time,session_count,average_session,last_used\n",
    );

    for c in chronometers {
        let summary = ChronometerSummary::of(c);
        let last_used = c
            .stats
            .last_used
            .and_then(crate::domain::time::local_datetime)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        let row = [
            csv_field(&c.id),
            csv_field(&c.name),
            csv_field(&c.color),
            c.order.to_string(),
            format_hms(c.display_time(now)),
            format_hms(summary.total_time),
            summary.session_count.to_string(),
            format_hms(summary.average_session),
            last_used,
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// One CSV row per committed session across all chronometers.
pub fn format_sessions_csv(chronometers: &[Chronometer]) -> String {
    let mut out = String::from("timer_id,timer_name,session_id,start,end,duration,duration_ms\n");

    for c in chronometers {
        for s in &c.stats.sessions {
            let row = [
                csv_field(&c.id),
                csv_field(&c.name),
                csv_field(&s.id),
                iso_time(s.start_time),
                iso_time(s.end_time),
                format_hms(s.duration),
                s.duration.to_string(),
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }
    }

    out
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn iso_time(timestamp_ms: i64) -> String {
    crate::domain::time::local_datetime(timestamp_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn clock_time(timestamp_ms: i64) -> String {
    crate::domain::time::local_datetime(timestamp_ms)
        .map_or_else(|| "-".to_string(), |dt| dt.format("%H:%M:%S").to_string())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
