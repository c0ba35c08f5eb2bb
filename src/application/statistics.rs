//! Statistics derived from a chronometer's committed sessions.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::time::local_datetime;
use crate::domain::{Chronometer, Session};

/// Summary figures for one chronometer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChronometerSummary {
    pub id: String,
    pub name: String,
    pub total_time: u64,
    pub session_count: u64,
    pub average_session: u64,
    pub longest_session: u64,
    pub shortest_session: u64,
    pub last_used: Option<i64>,
    pub created_at: i64,
}

impl ChronometerSummary {
    #[must_use]
    pub fn of(chronometer: &Chronometer) -> Self {
        let sessions = &chronometer.stats.sessions;
        Self {
            id: chronometer.id.clone(),
            name: chronometer.name.clone(),
            total_time: chronometer.stats.total_time,
            session_count: chronometer.stats.session_count,
            average_session: average_session(sessions),
            longest_session: sessions.iter().map(|s| s.duration).max().unwrap_or(0),
            shortest_session: sessions.iter().map(|s| s.duration).min().unwrap_or(0),
            last_used: chronometer.stats.last_used,
            created_at: chronometer.stats.created_at,
        }
    }
}

/// Mean session duration in milliseconds; 0 without sessions.
#[must_use]
pub fn average_session(sessions: &[Session]) -> u64 {
    if sessions.is_empty() {
        return 0;
    }
    let total: u128 = sessions.iter().map(|s| u128::from(s.duration)).sum();
    u64::try_from(total / sessions.len() as u128).unwrap_or(u64::MAX)
}

/// Sessions of one local calendar day.
#[derive(Debug, Clone)]
pub struct SessionDay<'a> {
    pub date: NaiveDate,
    pub sessions: Vec<&'a Session>,
}

impl SessionDay<'_> {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.sessions.iter().map(|s| s.duration).fold(0, u64::saturating_add)
    }
}

/// Group sessions by the local day they completed on; newest day first,
/// newest session first within a day.
#[must_use]
pub fn group_sessions_by_date(sessions: &[Session]) -> Vec<SessionDay<'_>> {
    let mut days: Vec<SessionDay<'_>> = Vec::new();

    for session in sessions {
        let Some(date) = local_datetime(session.completed_at).map(|dt| dt.date_naive()) else {
            continue;
        };
        match days.iter_mut().find(|d| d.date == date) {
            Some(day) => day.sessions.push(session),
            None => days.push(SessionDay {
                date,
                sessions: vec![session],
            }),
        }
    }

    days.sort_by(|a, b| b.date.cmp(&a.date));
    for day in &mut days {
        day.sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    }

    days
}

/// Board-wide totals. Sums saturate; stored totals come from user-editable
/// documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardTotals {
    pub chronometer_count: usize,
    pub running_count: usize,
    pub session_count: u64,
    pub total_time: u64,
}

#[must_use]
pub fn board_totals(chronometers: &[Chronometer]) -> BoardTotals {
    BoardTotals {
        chronometer_count: chronometers.len(),
        running_count: chronometers.iter().filter(|c| c.is_running).count(),
        session_count: chronometers
            .iter()
            .map(|c| c.stats.session_count)
            .fold(0, u64::saturating_add),
        total_time: chronometers
            .iter()
            .map(|c| c.stats.total_time)
            .fold(0, u64::saturating_add),
    }
}
