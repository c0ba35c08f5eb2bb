//! Synchronization between the board and its backing document.
//!
//! On connect the host note is initialized on a blocking task raced against
//! a timeout; if it errors or does not answer in time the service switches,
//! once and for good, to the local key-value store. Losing the host later (a
//! failed write or change check) makes the same one-way switch, carrying the
//! in-memory board over. Both backends receive the same JSON document.
//!
//! External edits always win: when the backend reports a change the whole
//! board is replaced by the re-parsed document. Concurrent writers are not
//! detected; the last write wins.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{AppError, BoardDocument, Clock, Result, Settings, StoredDocument};
use crate::infrastructure::document_store::content_hash;
use crate::infrastructure::{DocumentStore, LocalStorage, BOARD_KEY};

use super::board::Board;

/// Where the document is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Host note document.
    Host,
    /// Local key-value fallback.
    Standalone,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Standalone => write!(f, "standalone"),
        }
    }
}

enum Backend<S> {
    Host(S),
    Standalone {
        storage: LocalStorage,
        last_seen: Option<u64>,
    },
}

impl<S: DocumentStore> Backend<S> {
    fn standalone(storage: LocalStorage) -> Self {
        Self::Standalone {
            storage,
            last_seen: None,
        }
    }

    fn read(&mut self) -> Result<String> {
        match self {
            Self::Host(store) => store.read(),
            Self::Standalone { storage, last_seen } => {
                let text = storage.get_item(BOARD_KEY)?.unwrap_or_default();
                *last_seen = Some(content_hash(&text));
                Ok(text)
            }
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        match self {
            Self::Host(store) => store.write(text),
            Self::Standalone { storage, last_seen } => {
                storage.set_item(BOARD_KEY, text)?;
                *last_seen = Some(content_hash(text));
                Ok(())
            }
        }
    }

    fn has_external_change(&mut self) -> Result<bool> {
        match self {
            Self::Host(store) => store.has_external_change(),
            Self::Standalone { storage, last_seen } => {
                let text = storage.get_item(BOARD_KEY)?.unwrap_or_default();
                Ok(*last_seen != Some(content_hash(&text)))
            }
        }
    }

    const fn mode(&self) -> Mode {
        match self {
            Self::Host(_) => Mode::Host,
            Self::Standalone { .. } => Mode::Standalone,
        }
    }
}

/// Parse a stored document, failing soft to an empty board.
///
/// Accepts the current `{chronometers, settings}` object and the legacy bare
/// array. Empty text and unparseable text both yield the default document.
#[must_use]
pub fn parse_document(text: &str, now: i64) -> BoardDocument {
    if text.trim().is_empty() {
        return BoardDocument::default();
    }

    match serde_json::from_str::<StoredDocument>(text) {
        Ok(stored) => {
            if matches!(stored, StoredDocument::Legacy(_)) {
                tracing::info!("Upgrading legacy array document");
            }
            stored.into_document(now)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse note data; starting fresh");
            BoardDocument::default()
        }
    }
}

/// Serialize the board for storage.
///
/// # Errors
/// Returns error if serialization fails.
pub fn serialize_document(document: &BoardDocument) -> Result<String> {
    serde_json::to_string(document).map_err(AppError::json_parse)
}

/// Opens the local store when the host goes away.
type Fallback = Box<dyn FnOnce() -> Result<LocalStorage>>;

/// Service that owns the board and keeps it persisted.
pub struct SyncService<S> {
    backend: Backend<S>,
    board: Board,
    fallback: Option<Fallback>,
}

impl<S: DocumentStore> SyncService<S> {
    /// Connect to the host note, falling back to local storage when the host
    /// fails or stays silent for `init_timeout`.
    ///
    /// `fallback` is only invoked when needed, either here or later when the
    /// host stops accepting writes. If even local storage cannot be opened,
    /// an in-memory store keeps the board usable.
    ///
    /// # Errors
    /// Returns error only if no local store, not even in memory, can be opened.
    pub async fn connect<F>(
        mut store: S,
        fallback: F,
        init_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<LocalStorage> + 'static,
    {
        let description = store.describe();
        let init = tokio::task::spawn_blocking(move || {
            let outcome = store.initialize();
            (store, outcome)
        });

        // The handle is consumed here, so only the first outcome counts; a
        // late answer after the timeout is dropped with its task.
        let host = match tokio::time::timeout(init_timeout, init).await {
            Ok(Ok((store, Ok(())))) => {
                tracing::info!(store = %description, "Connected to host note");
                Some(store)
            }
            Ok(Ok((_, Err(e)))) => {
                tracing::warn!(store = %description, error = %e, "Host initialization failed; using local storage");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(store = %description, error = %e, "Host initialization panicked; using local storage");
                None
            }
            Err(_) => {
                tracing::warn!(
                    store = %description,
                    timeout = ?init_timeout,
                    "Host did not respond; using local storage"
                );
                None
            }
        };

        Ok(match host {
            Some(store) => Self::with_backend(Backend::Host(store), Some(Box::new(fallback)), clock),
            None => Self::with_backend(Backend::standalone(open_fallback(fallback)?), None, clock),
        })
    }

    /// Use local storage only, without trying the host.
    pub fn standalone(storage: LocalStorage, clock: Arc<dyn Clock>) -> Self {
        Self::with_backend(Backend::standalone(storage), None, clock)
    }

    fn with_backend(backend: Backend<S>, fallback: Option<Fallback>, clock: Arc<dyn Clock>) -> Self {
        let mut service = Self {
            backend,
            board: Board::new(clock),
            fallback,
        };
        service.reload();
        service
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.backend.mode()
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Run a board operation and persist the result if it changed anything.
    ///
    /// # Errors
    /// Propagates the operation's own (validation) error; the board is left
    /// as the operation left it and nothing is written.
    pub fn mutate<T>(&mut self, op: impl FnOnce(&mut Board) -> Result<T>) -> Result<T> {
        let before = self.board.to_document();
        let out = op(&mut self.board).inspect_err(|e| {
            if e.is_validation() {
                tracing::debug!(error = %e, "Operation rejected");
            } else {
                tracing::warn!(error = %e, "Operation failed");
            }
        })?;
        if self.board.to_document() != before {
            self.save();
        }
        Ok(out)
    }

    /// Replace settings and persist when they changed.
    pub fn update_settings(&mut self, settings: Settings) -> bool {
        let changed = self.board.update_settings(settings);
        if changed {
            self.save();
        }
        changed
    }

    /// Write the full document. Failures are logged, never raised; a host
    /// that rejects the write is dropped for local storage.
    pub fn save(&mut self) -> bool {
        let text = match serialize_document(&self.board.to_document()) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize board");
                return false;
            }
        };

        match self.backend.write(&text) {
            Ok(()) => {
                tracing::debug!(mode = %self.mode(), bytes = text.len(), "Board saved");
                true
            }
            Err(e) if self.mode() == Mode::Host => {
                tracing::warn!(error = %e, "Host rejected the write; switching to local storage");
                self.go_standalone() && self.write_local(&text)
            }
            Err(e) => {
                tracing::error!(mode = %self.mode(), error = %e, "Failed to save board");
                false
            }
        }
    }

    fn write_local(&mut self, text: &str) -> bool {
        match self.backend.write(text) {
            Ok(()) => {
                tracing::info!(bytes = text.len(), "Board saved to local storage");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save board to local storage");
                false
            }
        }
    }

    /// Replace the host backend with local storage. Happens at most once.
    fn go_standalone(&mut self) -> bool {
        if self.mode() == Mode::Standalone {
            return true;
        }
        let storage = match self.fallback.take() {
            Some(open) => open_fallback(open),
            None => LocalStorage::open_in_memory(),
        };
        match storage {
            Ok(storage) => {
                self.backend = Backend::standalone(storage);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to open any local storage");
                false
            }
        }
    }

    /// Re-read and replace the whole board from the backend.
    pub fn reload(&mut self) {
        let text = self.backend.read().unwrap_or_else(|e| {
            tracing::error!(mode = %self.backend.mode(), error = %e, "Failed to read board; starting fresh");
            String::new()
        });
        let document = parse_document(&text, self.board.now());
        tracing::debug!(chronometers = document.chronometers.len(), "Board loaded");
        self.board.replace(document);
    }

    /// Reload if someone else changed the document. Returns whether it did.
    ///
    /// An unreachable host keeps the current board and moves it to local
    /// storage.
    pub fn poll_external(&mut self) -> bool {
        match self.backend.has_external_change() {
            Ok(true) => {
                tracing::info!(mode = %self.mode(), "External change detected; reloading");
                self.reload();
                true
            }
            Ok(false) => false,
            Err(e) if self.mode() == Mode::Host => {
                tracing::warn!(error = %e, "Lost the host note; switching to local storage");
                if self.go_standalone() {
                    self.save();
                }
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to check for external changes");
                false
            }
        }
    }

    /// Snapshot running chronometers and persist. No-op when none run.
    pub fn autosave_tick(&mut self) -> usize {
        if !self.board.any_running() {
            return 0;
        }
        let snapshotted = self.board.autosave_snapshot();
        self.save();
        tracing::debug!(snapshotted, "Autosave");
        snapshotted
    }
}

fn open_fallback<F>(fallback: F) -> Result<LocalStorage>
where
    F: FnOnce() -> Result<LocalStorage>,
{
    fallback().or_else(|e| {
        tracing::error!(error = %e, "Failed to open local storage; changes will not persist");
        LocalStorage::open_in_memory()
    })
}
