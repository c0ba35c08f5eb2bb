//! Timer state engine.
//!
//! The board owns every chronometer plus the display settings and applies
//! user operations to them. Chronometers are kept sorted by `order`, and
//! `order` always equals the position in that sequence.
//!
//! Mutations return whether anything changed so the caller only persists
//! real changes. Time is read from an injected [`Clock`].

use std::sync::Arc;

use crate::domain::{
    parse_hms, AppError, BoardDocument, Chronometer, ChronometerColor, Clock, Result, Session,
    Settings,
};

/// Direction for moving a chronometer one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards order 0.
    Up,
    /// Towards the end.
    Down,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" | "left" | "prev" => Ok(Self::Up),
            "down" | "right" | "next" => Ok(Self::Down),
            _ => Err(format!("Unknown direction: {s}. Use: up, down")),
        }
    }
}

/// All chronometers and settings of one note.
pub struct Board {
    chronometers: Vec<Chronometer>,
    settings: Settings,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("chronometers", &self.chronometers)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Board {
    /// Empty board with default settings.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            chronometers: Vec::new(),
            settings: Settings::default(),
            clock,
        }
    }

    /// Replace everything with `document`; no merge.
    pub fn replace(&mut self, document: BoardDocument) {
        self.chronometers = document.chronometers;
        self.chronometers.sort_by_key(|c| c.order);
        self.renumber();
        self.settings = document.settings;
    }

    /// Snapshot of the persisted state.
    #[must_use]
    pub fn to_document(&self) -> BoardDocument {
        BoardDocument {
            chronometers: self.chronometers.clone(),
            settings: self.settings,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Chronometers in display order.
    #[must_use]
    pub fn chronometers(&self) -> &[Chronometer] {
        &self.chronometers
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chronometers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chronometers.is_empty()
    }

    #[must_use]
    pub fn any_running(&self) -> bool {
        self.chronometers.iter().any(|c| c.is_running)
    }

    /// Look up a chronometer by id.
    ///
    /// # Errors
    /// `TimerNotFound` for unknown ids.
    pub fn get(&self, id: &str) -> Result<&Chronometer> {
        self.chronometers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found(id))
    }

    /// Resolve user input to a chronometer id.
    ///
    /// Accepts a 1-based position, an exact id, an exact name
    /// (case-insensitive) or an unambiguous id prefix.
    ///
    /// # Errors
    /// `TimerNotFound` when nothing (or more than one prefix match) fits.
    pub fn resolve(&self, query: &str) -> Result<String> {
        let query = query.trim();

        if let Ok(number) = query.parse::<usize>() {
            if let Some(c) = number.checked_sub(1).and_then(|i| self.chronometers.get(i)) {
                return Ok(c.id.clone());
            }
        }

        if let Some(c) = self.chronometers.iter().find(|c| c.id == query) {
            return Ok(c.id.clone());
        }

        if let Some(c) = self
            .chronometers
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(query))
        {
            return Ok(c.id.clone());
        }

        let mut prefixed = self
            .chronometers
            .iter()
            .filter(|c| !query.is_empty() && c.id.starts_with(query));
        match (prefixed.next(), prefixed.next()) {
            (Some(c), None) => Ok(c.id.clone()),
            _ => Err(AppError::not_found(query)),
        }
    }

    /// Time shown for a chronometer right now.
    ///
    /// # Errors
    /// `TimerNotFound` for unknown ids.
    pub fn display_time(&self, id: &str) -> Result<u64> {
        Ok(self.get(id)?.display_time(self.now()))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Append a new chronometer at the end; returns its id.
    ///
    /// # Errors
    /// `ReadOnly` in read-only mode, `EmptyName` for a blank explicit name.
    pub fn add(&mut self, name: Option<&str>) -> Result<String> {
        self.ensure_writable()?;

        let name = match name.map(str::trim) {
            Some("") => return Err(AppError::EmptyName),
            Some(name) => name.to_string(),
            None => format!("Timer {}", self.chronometers.len() + 1),
        };

        let id = uuid::Uuid::new_v4().to_string();
        let order = self.chronometers.len();
        self.chronometers
            .push(Chronometer::new(id.clone(), name, order, self.now()));

        tracing::info!(id = %id, order, "Chronometer added");
        Ok(id)
    }

    /// # Errors
    /// `AlreadyRunning`, `TimerNotFound` or `ReadOnly`.
    pub fn start(&mut self, id: &str) -> Result<()> {
        let now = self.now();
        self.writable_mut(id)?.start(now)?;
        tracing::debug!(id, now, "Chronometer started");
        Ok(())
    }

    /// # Errors
    /// `NotRunning`, `TimerNotFound` or `ReadOnly`.
    pub fn pause(&mut self, id: &str) -> Result<()> {
        let now = self.now();
        let c = self.writable_mut(id)?;
        c.pause(now)?;
        tracing::debug!(id, elapsed = c.elapsed_time, "Chronometer paused");
        Ok(())
    }

    /// Pause a running chronometer, start a paused one. Returns the new
    /// running state.
    ///
    /// # Errors
    /// `TimerNotFound` or `ReadOnly`.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        if self.get(id)?.is_running {
            self.pause(id)?;
            Ok(false)
        } else {
            self.start(id)?;
            Ok(true)
        }
    }

    /// Zero a chronometer, committing a session when time had accrued.
    ///
    /// # Errors
    /// `TimerNotFound` or `ReadOnly`.
    pub fn reset(&mut self, id: &str) -> Result<Option<Session>> {
        let now = self.now();
        let c = self.writable_mut(id)?;
        let session = c.reset(now, uuid::Uuid::new_v4().to_string());

        match &session {
            Some(s) => tracing::info!(
                id,
                duration_ms = s.duration,
                sessions = c.stats.session_count,
                "Session recorded"
            ),
            None => tracing::debug!(id, "Reset without accrued time"),
        }

        Ok(session)
    }

    /// Manual time edit from an `HH:MM:SS` string. Leaves the chronometer
    /// paused and records no session.
    ///
    /// # Errors
    /// `InvalidTimeFormat`, `InvalidTimeRange`, `TimerNotFound` or `ReadOnly`.
    pub fn set_time(&mut self, id: &str, input: &str) -> Result<u64> {
        self.ensure_writable()?;
        self.get(id)?;
        let elapsed = parse_hms(input)?;
        self.writable_mut(id)?.set_elapsed(elapsed);
        Ok(elapsed)
    }

    /// # Errors
    /// `EmptyName`, `TimerNotFound` or `ReadOnly`.
    pub fn rename(&mut self, id: &str, name: &str) -> Result<bool> {
        let trimmed = name.trim();
        let c = self.writable_mut(id)?;
        if trimmed.is_empty() {
            return Err(AppError::EmptyName);
        }
        if c.name == trimmed {
            return Ok(false);
        }
        c.name = trimmed.to_string();
        Ok(true)
    }

    /// Move a chronometer to `new_index`, clamped to the valid range.
    ///
    /// # Errors
    /// `TimerNotFound` or `ReadOnly`.
    pub fn reorder(&mut self, id: &str, new_index: usize) -> Result<bool> {
        self.ensure_writable()?;
        let from = self.index_of(id)?;
        let to = new_index.min(self.chronometers.len() - 1);
        if from == to {
            return Ok(false);
        }

        let c = self.chronometers.remove(from);
        self.chronometers.insert(to, c);
        self.renumber();
        Ok(true)
    }

    /// Swap with the neighbour in `direction`; no-op at the edges.
    ///
    /// # Errors
    /// `TimerNotFound` or `ReadOnly`.
    pub fn move_adjacent(&mut self, id: &str, direction: Direction) -> Result<bool> {
        self.ensure_writable()?;
        let from = self.index_of(id)?;
        let to = match direction {
            Direction::Up => from.checked_sub(1),
            Direction::Down => Some(from + 1).filter(|&i| i < self.chronometers.len()),
        };

        let Some(to) = to else {
            return Ok(false);
        };

        self.chronometers.swap(from, to);
        self.renumber();
        Ok(true)
    }

    /// Store a color id. Unknown ids are kept and render as the default.
    ///
    /// # Errors
    /// `TimerNotFound` or `ReadOnly`.
    pub fn set_color(&mut self, id: &str, color: &str) -> Result<bool> {
        let color = color.trim().to_lowercase();
        if ChronometerColor::from_id(&color).is_none() {
            tracing::warn!(id, color = %color, "Unknown color; it will render as the default");
        }

        let c = self.writable_mut(id)?;
        if c.color == color {
            return Ok(false);
        }
        c.color = color;
        Ok(true)
    }

    /// Remove a chronometer; every later one moves up one slot.
    ///
    /// # Errors
    /// `TimerNotFound` or `ReadOnly`.
    pub fn delete(&mut self, id: &str) -> Result<Chronometer> {
        self.ensure_writable()?;
        let index = self.index_of(id)?;
        let removed = self.chronometers.remove(index);
        self.renumber();
        tracing::info!(id, name = %removed.name, "Chronometer deleted");
        Ok(removed)
    }

    /// Replace the settings; returns whether they differed.
    pub fn update_settings(&mut self, settings: Settings) -> bool {
        if self.settings == settings {
            return false;
        }
        self.settings = settings;
        true
    }

    /// Fold running intervals into `elapsed_time` so they survive a crash.
    /// Returns how many chronometers were snapshotted.
    pub fn autosave_snapshot(&mut self) -> usize {
        let now = self.now();
        self.chronometers
            .iter_mut()
            .map(|c| c.snapshot(now))
            .filter(|&snapshotted| snapshotted)
            .count()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_writable(&self) -> Result<()> {
        if self.settings.read_only_mode {
            return Err(AppError::ReadOnly);
        }
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.chronometers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::not_found(id))
    }

    fn writable_mut(&mut self, id: &str) -> Result<&mut Chronometer> {
        self.ensure_writable()?;
        let index = self.index_of(id)?;
        Ok(&mut self.chronometers[index])
    }

    fn renumber(&mut self) {
        for (rank, c) in self.chronometers.iter_mut().enumerate() {
            c.order = rank;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManualClock;
    use proptest::prelude::*;

    fn board_with(n: usize) -> (Board, ManualClock) {
        let clock = ManualClock::at(0);
        let mut board = Board::new(Arc::new(clock.clone()));
        for _ in 0..n {
            board.add(None).unwrap();
        }
        (board, clock)
    }

    fn names(board: &Board) -> Vec<String> {
        board.chronometers().iter().map(|c| c.name.clone()).collect()
    }

    fn orders(board: &Board) -> Vec<usize> {
        board.chronometers().iter().map(|c| c.order).collect()
    }

    fn id_at(board: &Board, index: usize) -> String {
        board.chronometers()[index].id.clone()
    }

    #[test]
    fn test_add_appends_with_default_names() {
        let (board, _) = board_with(3);
        assert_eq!(names(&board), ["Timer 1", "Timer 2", "Timer 3"]);
        assert_eq!(orders(&board), [0, 1, 2]);
        assert!(board.chronometers().iter().all(|c| c.elapsed_time == 0));
    }

    #[test]
    fn test_elapsed_is_sum_of_intervals() {
        let (mut board, clock) = board_with(1);
        let id = id_at(&board, 0);

        board.start(&id).unwrap();
        clock.advance(1_200);
        board.pause(&id).unwrap();
        clock.advance(10_000);
        board.start(&id).unwrap();
        clock.advance(800);
        board.pause(&id).unwrap();
        assert!(board.pause(&id).is_err());

        assert_eq!(board.get(&id).unwrap().elapsed_time, 2_000);
    }

    #[test]
    fn test_toggle_flips_state() {
        let (mut board, clock) = board_with(1);
        let id = id_at(&board, 0);
        assert!(board.toggle(&id).unwrap());
        clock.advance(50);
        assert!(!board.toggle(&id).unwrap());
        assert_eq!(board.get(&id).unwrap().elapsed_time, 50);
    }

    #[test]
    fn test_reset_records_exactly_one_session() {
        let (mut board, clock) = board_with(1);
        let id = id_at(&board, 0);

        board.start(&id).unwrap();
        clock.advance(4_000);
        let session = board.reset(&id).unwrap().unwrap();

        let c = board.get(&id).unwrap();
        assert_eq!(session.duration, 4_000);
        assert_eq!(c.stats.session_count, 1);
        assert_eq!(c.stats.sessions.len(), 1);
        assert_eq!(c.stats.total_time, 4_000);
        assert_eq!(c.elapsed_time, 0);

        assert!(board.reset(&id).unwrap().is_none());
        assert_eq!(board.get(&id).unwrap().stats.session_count, 1);
    }

    #[test]
    fn test_reset_paused_timer_records_session() {
        let (mut board, clock) = board_with(1);
        let id = id_at(&board, 0);
        board.start(&id).unwrap();
        clock.advance(700);
        board.pause(&id).unwrap();
        clock.advance(5_000);

        let session = board.reset(&id).unwrap().unwrap();
        assert_eq!(session.duration, 700);
        assert_eq!(session.end_time - session.start_time, 700);
    }

    #[test]
    fn test_set_time_validation() {
        let (mut board, _) = board_with(1);
        let id = id_at(&board, 0);
        board.start(&id).unwrap();

        assert!(matches!(
            board.set_time(&id, "1:60:00"),
            Err(AppError::InvalidTimeRange { .. })
        ));
        assert!(board.get(&id).unwrap().is_running);

        assert_eq!(board.set_time(&id, "61:00:00").unwrap(), 219_600_000);
        let c = board.get(&id).unwrap();
        assert!(!c.is_running);
        assert_eq!(c.start_time, None);
        assert_eq!(c.stats.session_count, 0);
    }

    #[test]
    fn test_rename_rules() {
        let (mut board, _) = board_with(1);
        let id = id_at(&board, 0);
        assert!(matches!(board.rename(&id, "   "), Err(AppError::EmptyName)));
        assert!(board.rename(&id, "  Reading ").unwrap());
        assert_eq!(board.get(&id).unwrap().name, "Reading");
        assert!(!board.rename(&id, "Reading").unwrap());
    }

    #[test]
    fn test_reorder_moves_and_clamps() {
        let (mut board, _) = board_with(4);
        let first = id_at(&board, 0);

        assert!(!board.reorder(&first, 0).unwrap());
        assert!(board.reorder(&first, 99).unwrap());
        assert_eq!(names(&board), ["Timer 2", "Timer 3", "Timer 4", "Timer 1"]);
        assert_eq!(orders(&board), [0, 1, 2, 3]);

        let moved = id_at(&board, 3);
        board.reorder(&moved, 1).unwrap();
        assert_eq!(names(&board), ["Timer 2", "Timer 1", "Timer 3", "Timer 4"]);
    }

    #[test]
    fn test_move_adjacent_edges() {
        let (mut board, _) = board_with(3);
        let first = id_at(&board, 0);
        let last = id_at(&board, 2);

        assert!(!board.move_adjacent(&first, Direction::Up).unwrap());
        assert!(!board.move_adjacent(&last, Direction::Down).unwrap());

        assert!(board.move_adjacent(&first, Direction::Down).unwrap());
        assert_eq!(names(&board), ["Timer 2", "Timer 1", "Timer 3"]);
        assert_eq!(orders(&board), [0, 1, 2]);
    }

    #[test]
    fn test_delete_compacts_later_orders_only() {
        let (mut board, _) = board_with(4);
        let before: Vec<(String, usize)> = board
            .chronometers()
            .iter()
            .map(|c| (c.id.clone(), c.order))
            .collect();

        board.delete(&before[1].0).unwrap();

        for (id, order) in &before {
            let Ok(c) = board.get(id) else { continue };
            let expected = if *order > 1 { order - 1 } else { *order };
            assert_eq!(c.order, expected);
        }
        assert_eq!(board.len(), 3);
    }

    #[test]
    fn test_set_color_accepts_unknown() {
        let (mut board, _) = board_with(1);
        let id = id_at(&board, 0);
        assert!(board.set_color(&id, "Green").unwrap());
        assert_eq!(board.get(&id).unwrap().color, "green");
        assert!(board.set_color(&id, "mauve").unwrap());
        assert_eq!(
            board.get(&id).unwrap().palette_color(),
            ChronometerColor::Blue
        );
    }

    #[test]
    fn test_autosave_snapshot_scenario() {
        let (mut board, clock) = board_with(2);
        let a = id_at(&board, 0);
        board.start(&a).unwrap();

        clock.set(5_000);
        assert_eq!(board.autosave_snapshot(), 1);

        let c = board.get(&a).unwrap();
        assert_eq!(c.elapsed_time, 5_000);
        assert_eq!(c.start_time, Some(5_000));
        assert!(c.is_running);
        assert_eq!(board.get(&id_at(&board, 1)).unwrap().elapsed_time, 0);
    }

    #[test]
    fn test_read_only_rejects_mutations() {
        let (mut board, clock) = board_with(2);
        let running = id_at(&board, 0);
        let paused = id_at(&board, 1);
        board.start(&running).unwrap();
        clock.set(1_000);
        board.update_settings(Settings {
            read_only_mode: true,
            ..Settings::default()
        });
        let before = board.to_document();

        let rejected = [
            board.add(None).map(drop),
            board.start(&paused),
            board.pause(&running),
            board.toggle(&running).map(drop),
            board.toggle(&paused).map(drop),
            board.reset(&running).map(drop),
            board.set_time(&paused, "01:00:00").map(drop),
            board.rename(&paused, "x").map(drop),
            board.reorder(&paused, 0).map(drop),
            board.move_adjacent(&running, Direction::Down).map(drop),
            board.set_color(&paused, "red").map(drop),
            board.delete(&paused).map(drop),
        ];
        for result in rejected {
            assert!(matches!(result, Err(AppError::ReadOnly)));
        }
        assert_eq!(board.to_document(), before);

        // Running time still survives and the mode can be switched off.
        clock.set(2_000);
        assert_eq!(board.autosave_snapshot(), 1);
        assert_eq!(board.get(&running).unwrap().elapsed_time, 2_000);
        assert!(board.update_settings(Settings::default()));
        assert!(board.pause(&running).is_ok());
    }

    #[test]
    fn test_unknown_id() {
        let (mut board, _) = board_with(1);
        assert!(matches!(
            board.start("nope"),
            Err(AppError::TimerNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_inputs() {
        let (mut board, _) = board_with(2);
        let second = id_at(&board, 1);
        board.rename(&second, "Deep Work").unwrap();

        assert_eq!(board.resolve("2").unwrap(), second);
        assert_eq!(board.resolve("deep work").unwrap(), second);
        assert_eq!(board.resolve(&second).unwrap(), second);
        assert_eq!(board.resolve(&second[..8]).unwrap(), second);
        assert!(board.resolve("3").is_err());
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("UP".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("down".parse::<Direction>().unwrap(), Direction::Down);
        assert!("sideways".parse::<Direction>().is_err());
    }

    proptest! {
        #[test]
        fn reorder_keeps_orders_a_permutation(n in 1usize..8, from in 0usize..8, to in 0usize..16) {
            let (mut board, _) = board_with(n);
            let id = id_at(&board, from % n);
            board.reorder(&id, to).unwrap();

            prop_assert_eq!(orders(&board), (0..n).collect::<Vec<_>>());
            prop_assert_eq!(board.get(&id).unwrap().order, to.min(n - 1));
        }

        #[test]
        fn delete_keeps_orders_contiguous(n in 1usize..8, victim in 0usize..8) {
            let (mut board, _) = board_with(n);
            let id = id_at(&board, victim % n);
            board.delete(&id).unwrap();

            prop_assert_eq!(orders(&board), (0..n - 1).collect::<Vec<_>>());
            prop_assert!(board.get(&id).is_err());
        }
    }
}
