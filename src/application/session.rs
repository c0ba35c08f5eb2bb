//! Live watch session.
//!
//! Drives the two interval timers of a running board: a fast display tick
//! (presentation only) and the slower autosave tick, which is the only path
//! that durably advances `elapsedTime` while a chronometer runs. Both ticks
//! exist only while at least one chronometer is running. A third tick polls
//! the backend for external edits.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};

use crate::domain::AppConfig;
use crate::infrastructure::DocumentStore;

use super::board::Board;
use super::sync_service::SyncService;

/// Tick periods of a watch session.
#[derive(Debug, Clone, Copy)]
pub struct WatchTiming {
    pub refresh: Duration,
    pub autosave: Duration,
    pub poll: Duration,
}

impl WatchTiming {
    #[must_use]
    pub const fn from_config(config: &AppConfig) -> Self {
        Self {
            refresh: config.refresh_interval(),
            autosave: config.autosave_interval(),
            poll: config.poll_interval(),
        }
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub autosaves: usize,
    pub reloads: usize,
    pub frames: usize,
}

fn periodic(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Run until `shutdown` resolves, then take a final snapshot.
///
/// `frame` builds the text to show; `draw` is called only when that text
/// differs from the previous frame.
pub async fn run_watch<S, F, D>(
    service: &mut SyncService<S>,
    timing: WatchTiming,
    shutdown: impl Future<Output = ()>,
    frame: F,
    mut draw: D,
) -> WatchReport
where
    S: DocumentStore,
    F: Fn(&Board) -> String,
    D: FnMut(&str),
{
    let mut report = WatchReport::default();
    let mut display: Option<Interval> = None;
    let mut autosave: Option<Interval> = None;
    let mut poll = interval(timing.poll.max(Duration::from_millis(1)));
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = String::new();

    tokio::pin!(shutdown);
    tracing::info!(mode = %service.mode(), "Watch session started");

    loop {
        let current = frame(service.board());
        if current != last_frame {
            draw(&current);
            report.frames += 1;
            last_frame = current;
        }

        let running = service.board().any_running();
        match (running, autosave.is_some()) {
            (true, false) => {
                display = Some(periodic(timing.refresh));
                autosave = Some(periodic(timing.autosave));
                tracing::debug!("Chronometer running; ticks armed");
            }
            (false, true) => {
                display = None;
                autosave = None;
                tracing::debug!("No chronometer running; ticks torn down");
            }
            _ => {}
        }

        tokio::select! {
            () = &mut shutdown => break,
            () = tick(&mut display) => {}
            () = tick(&mut autosave) => {
                if service.autosave_tick() > 0 {
                    report.autosaves += 1;
                }
            }
            _ = poll.tick() => {
                if service.poll_external() {
                    report.reloads += 1;
                }
            }
        }
    }

    service.autosave_tick();
    tracing::info!(autosaves = report.autosaves, reloads = report.reloads, "Watch session ended");
    report
}
