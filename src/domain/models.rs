//! Domain models for chronometers and their persisted document.
//!
//! The on-disk shape is camelCase JSON shared with the host note, so every
//! persisted struct renames its fields accordingly.

use serde::{Deserialize, Serialize};

use super::time::span_ms;
use super::{AppError, Result};

/// Fixed color palette for chronometer tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChronometerColor {
    #[default]
    Blue,
    Green,
    Red,
    Orange,
    Purple,
    Pink,
    Yellow,
    Teal,
    Gray,
}

impl ChronometerColor {
    pub const PALETTE: [Self; 9] = [
        Self::Blue,
        Self::Green,
        Self::Red,
        Self::Orange,
        Self::Purple,
        Self::Pink,
        Self::Yellow,
        Self::Teal,
        Self::Gray,
    ];

    /// Palette identifier as stored in the document.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::Yellow => "yellow",
            Self::Teal => "teal",
            Self::Gray => "gray",
        }
    }

    /// Look up a palette entry by identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::PALETTE.into_iter().find(|c| c.id() == id)
    }

    /// Resolve a stored identifier, falling back to the default color.
    #[must_use]
    pub fn resolve(id: &str) -> Self {
        Self::from_id(id).unwrap_or_default()
    }
}

impl std::fmt::Display for ChronometerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One completed run of a chronometer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub duration: u64,
    pub completed_at: i64,
}

/// Aggregate usage statistics of a chronometer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChronometerStats {
    /// Sum of all committed session durations.
    #[serde(default)]
    pub total_time: u64,
    #[serde(default)]
    pub session_count: u64,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_used: Option<i64>,
}

impl ChronometerStats {
    /// Fresh statistics for a chronometer created at `now`.
    #[must_use]
    pub fn created(now: i64) -> Self {
        Self {
            created_at: now,
            ..Self::default()
        }
    }

    fn commit(&mut self, session: Session) {
        self.total_time = self.total_time.saturating_add(session.duration);
        self.session_count = self.session_count.saturating_add(1);
        self.last_used = Some(session.completed_at);
        self.sessions.push(session);
    }
}

/// A single user-created stopwatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chronometer {
    pub id: String,
    pub name: String,
    /// Start of the current running interval; `None` while paused.
    pub start_time: Option<i64>,
    /// Accumulated active milliseconds, excluding the current interval.
    pub elapsed_time: u64,
    pub is_running: bool,
    pub order: usize,
    pub color: String,
    pub stats: ChronometerStats,
}

impl Chronometer {
    /// Create a paused chronometer with zero elapsed time.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: usize, now: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_time: None,
            elapsed_time: 0,
            is_running: false,
            order,
            color: ChronometerColor::default().id().to_string(),
            stats: ChronometerStats::created(now),
        }
    }

    /// Elapsed time including the running interval, as shown to the user.
    #[must_use]
    pub fn display_time(&self, now: i64) -> u64 {
        match (self.is_running, self.start_time) {
            (true, Some(start)) => self.elapsed_time.saturating_add(span_ms(start, now)),
            _ => self.elapsed_time,
        }
    }

    /// Palette color, unknown identifiers resolving to the default.
    #[must_use]
    pub fn palette_color(&self) -> ChronometerColor {
        ChronometerColor::resolve(&self.color)
    }

    /// Begin a running interval.
    ///
    /// # Errors
    /// `AlreadyRunning` if the chronometer is running.
    pub fn start(&mut self, now: i64) -> Result<()> {
        if self.is_running {
            return Err(AppError::AlreadyRunning {
                name: self.name.clone(),
            });
        }
        self.is_running = true;
        self.start_time = Some(now);
        Ok(())
    }

    /// Close the running interval into `elapsed_time`.
    ///
    /// # Errors
    /// `NotRunning` if the chronometer is paused.
    pub fn pause(&mut self, now: i64) -> Result<()> {
        if !self.is_running {
            return Err(AppError::NotRunning {
                name: self.name.clone(),
            });
        }
        self.elapsed_time = self.display_time(now);
        self.is_running = false;
        self.start_time = None;
        Ok(())
    }

    /// Zero the chronometer, committing a session if any time had accrued.
    pub fn reset(&mut self, now: i64, session_id: impl Into<String>) -> Option<Session> {
        let duration = self.display_time(now);
        self.elapsed_time = 0;
        self.is_running = false;
        self.start_time = None;

        if duration == 0 {
            return None;
        }

        let session = Session {
            id: session_id.into(),
            start_time: now.saturating_sub(i64::try_from(duration).unwrap_or(i64::MAX)),
            end_time: now,
            duration,
            completed_at: now,
        };
        self.stats.commit(session.clone());
        Some(session)
    }

    /// Overwrite the elapsed time from a manual edit; leaves the timer paused.
    pub fn set_elapsed(&mut self, elapsed_ms: u64) {
        self.elapsed_time = elapsed_ms;
        self.is_running = false;
        self.start_time = None;
    }

    /// Fold the running interval into `elapsed_time` and restart it at `now`.
    ///
    /// Returns false for paused chronometers.
    pub fn snapshot(&mut self, now: i64) -> bool {
        if !self.is_running {
            return false;
        }
        self.elapsed_time = self.display_time(now);
        self.start_time = Some(now);
        true
    }
}

/// User-facing display toggles, persisted alongside the chronometers.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub hide_statistics: bool,
    pub skip_reset_confirmation: bool,
    pub expand_all_stats: bool,
    pub read_only_mode: bool,
    pub hide_statistics_buttons: bool,
}

/// The full persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoardDocument {
    pub chronometers: Vec<Chronometer>,
    pub settings: Settings,
}

/// Chronometer as found in a stored document, possibly written by an older
/// version without `order`, `color` or `stats`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChronometer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub elapsed_time: u64,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub order: Option<usize>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub stats: Option<StoredStats>,
}

/// Statistics block as stored; any field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStats {
    #[serde(default)]
    pub total_time: u64,
    #[serde(default)]
    pub session_count: u64,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub last_used: Option<i64>,
}

impl StoredStats {
    /// A block without `createdAt` counts as created when it was loaded.
    #[must_use]
    pub fn hydrate(self, now: i64) -> ChronometerStats {
        ChronometerStats {
            total_time: self.total_time,
            session_count: self.session_count,
            sessions: self.sessions,
            created_at: self.created_at.unwrap_or(now),
            last_used: self.last_used,
        }
    }
}

impl StoredChronometer {
    /// Fill in fields missing from older documents.
    #[must_use]
    pub fn hydrate(self, index: usize, now: i64) -> Chronometer {
        let name = if self.name.trim().is_empty() {
            format!("Timer {}", index + 1)
        } else {
            self.name
        };

        // A running timer needs a start; treat a dangling flag as paused.
        let (is_running, start_time) = match (self.is_running, self.start_time) {
            (true, Some(start)) => (true, Some(start)),
            _ => (false, None),
        };

        Chronometer {
            id: self.id,
            name,
            start_time,
            elapsed_time: self.elapsed_time,
            is_running,
            order: self.order.unwrap_or(index),
            color: self
                .color
                .unwrap_or_else(|| ChronometerColor::default().id().to_string()),
            stats: self.stats.unwrap_or_default().hydrate(now),
        }
    }
}

/// Any document shape accepted on load: the current object first, then the
/// legacy bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredDocument {
    Current {
        chronometers: Vec<StoredChronometer>,
        #[serde(default)]
        settings: Settings,
    },
    Legacy(Vec<StoredChronometer>),
}

impl StoredDocument {
    /// Hydrate into a document with contiguous `order` values.
    #[must_use]
    pub fn into_document(self, now: i64) -> BoardDocument {
        let (stored, settings) = match self {
            Self::Current {
                chronometers,
                settings,
            } => (chronometers, settings),
            Self::Legacy(chronometers) => (chronometers, Settings::default()),
        };

        let mut chronometers: Vec<(usize, Chronometer)> = stored
            .into_iter()
            .enumerate()
            .map(|(i, c)| (i, c.hydrate(i, now)))
            .collect();

        chronometers.sort_by_key(|(i, c)| (c.order, *i));

        let chronometers = chronometers
            .into_iter()
            .enumerate()
            .map(|(rank, (_, mut c))| {
                c.order = rank;
                c
            })
            .collect();

        BoardDocument {
            chronometers,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_pause_accumulates() {
        let mut c = Chronometer::new("a", "A", 0, 0);
        c.start(1_000).unwrap();
        c.pause(3_500).unwrap();
        c.start(10_000).unwrap();
        c.pause(10_250).unwrap();
        assert_eq!(c.elapsed_time, 2_750);
        assert!(!c.is_running);
        assert_eq!(c.start_time, None);
    }

    #[test]
    fn test_double_pause_keeps_elapsed() {
        let mut c = Chronometer::new("a", "A", 0, 0);
        c.start(0).unwrap();
        c.pause(400).unwrap();
        assert!(matches!(c.pause(900), Err(AppError::NotRunning { .. })));
        assert_eq!(c.elapsed_time, 400);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut c = Chronometer::new("a", "A", 0, 0);
        c.start(0).unwrap();
        assert!(matches!(c.start(5), Err(AppError::AlreadyRunning { .. })));
        assert_eq!(c.start_time, Some(0));
    }

    #[test]
    fn test_display_time() {
        let mut c = Chronometer::new("a", "A", 0, 0);
        c.elapsed_time = 1_000;
        assert_eq!(c.display_time(99_999), 1_000);
        c.start(2_000).unwrap();
        assert_eq!(c.display_time(2_500), 1_500);
    }

    #[test]
    fn test_reset_commits_session_from_running() {
        let mut c = Chronometer::new("a", "A", 0, 0);
        c.elapsed_time = 1_000;
        c.start(5_000).unwrap();
        let session = c.reset(7_000, "s1").unwrap();
        assert_eq!(session.duration, 3_000);
        assert_eq!(session.end_time, 7_000);
        assert_eq!(session.start_time, 4_000);
        assert_eq!(session.completed_at, 7_000);
        assert_eq!(c.stats.session_count, 1);
        assert_eq!(c.stats.total_time, 3_000);
        assert_eq!(c.stats.last_used, Some(7_000));
        assert_eq!(c.elapsed_time, 0);
        assert!(!c.is_running);
    }

    #[test]
    fn test_reset_zero_paused_commits_nothing() {
        let mut c = Chronometer::new("a", "A", 0, 0);
        assert!(c.reset(1_000, "s1").is_none());
        assert_eq!(c.stats.session_count, 0);
        assert!(c.stats.sessions.is_empty());
        assert_eq!(c.stats.last_used, None);
    }

    #[test]
    fn test_snapshot_moves_start() {
        let mut c = Chronometer::new("a", "A", 0, 0);
        c.start(0).unwrap();
        assert!(c.snapshot(5_000));
        assert_eq!(c.elapsed_time, 5_000);
        assert_eq!(c.start_time, Some(5_000));
        assert!(c.is_running);

        c.pause(6_000).unwrap();
        assert!(!c.snapshot(7_000));
        assert_eq!(c.elapsed_time, 6_000);
    }

    #[test]
    fn test_color_resolution() {
        assert_eq!(ChronometerColor::resolve("teal"), ChronometerColor::Teal);
        assert_eq!(ChronometerColor::resolve("chartreuse"), ChronometerColor::Blue);
        let mut c = Chronometer::new("a", "A", 0, 0);
        c.color = "nope".into();
        assert_eq!(c.palette_color(), ChronometerColor::Blue);
    }

    #[test]
    fn test_legacy_hydration_fills_defaults() {
        let json = r#"[{"id":"1700000000000","name":"Work","startTime":null,"elapsedTime":42,"isRunning":false}]"#;
        let doc: StoredDocument = serde_json::from_str(json).unwrap();
        let doc = doc.into_document(123);
        let c = &doc.chronometers[0];
        assert_eq!(c.order, 0);
        assert_eq!(c.color, "blue");
        assert_eq!(c.stats.created_at, 123);
        assert_eq!(c.elapsed_time, 42);
        assert_eq!(doc.settings, Settings::default());
    }

    #[test]
    fn test_partial_stats_default_created_at_to_load_time() {
        let json = r#"[
            {"id":"a","name":"A","elapsedTime":0,"isRunning":false,"stats":{"totalTime":500,"sessionCount":1}},
            {"id":"b","name":"B","elapsedTime":0,"isRunning":false,"stats":{"createdAt":77}}
        ]"#;
        let doc: StoredDocument = serde_json::from_str(json).unwrap();
        let doc = doc.into_document(4_000);

        let a = &doc.chronometers[0];
        assert_eq!(a.stats.created_at, 4_000);
        assert_eq!(a.stats.total_time, 500);
        assert_eq!(a.stats.session_count, 1);
        assert_eq!(doc.chronometers[1].stats.created_at, 77);
    }

    #[test]
    fn test_dangling_running_flag_is_repaired() {
        let json = r#"{"chronometers":[{"id":"x","name":"X","startTime":null,"elapsedTime":5,"isRunning":true}]}"#;
        let doc: StoredDocument = serde_json::from_str(json).unwrap();
        let doc = doc.into_document(0);
        assert!(!doc.chronometers[0].is_running);
        assert_eq!(doc.chronometers[0].start_time, None);
    }

    #[test]
    fn test_orders_are_recompacted() {
        let json = r#"{"chronometers":[
            {"id":"a","name":"A","elapsedTime":0,"isRunning":false,"order":7},
            {"id":"b","name":"B","elapsedTime":0,"isRunning":false,"order":2},
            {"id":"c","name":"C","elapsedTime":0,"isRunning":false,"order":2}
        ]}"#;
        let doc: StoredDocument = serde_json::from_str(json).unwrap();
        let doc = doc.into_document(0);
        let ids: Vec<_> = doc.chronometers.iter().map(|c| c.id.as_str()).collect();
        let orders: Vec<_> = doc.chronometers.iter().map(|c| c.order).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        assert_eq!(orders, [0, 1, 2]);
    }

    #[test]
    fn test_document_serializes_camel_case() {
        let doc = BoardDocument {
            chronometers: vec![Chronometer::new("a", "A", 0, 9)],
            settings: Settings::default(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        let c = &json["chronometers"][0];
        assert!(c.get("elapsedTime").is_some());
        assert!(c.get("isRunning").is_some());
        assert_eq!(c["stats"]["createdAt"], 9);
        assert!(json["settings"].get("readOnlyMode").is_some());
    }
}
