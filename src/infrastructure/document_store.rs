//! Host note document store.
//!
//! The host exposes a single text document with initialize/read/write and
//! change notification. Notifications are modelled as a poll: the store
//! remembers a hash of the last text it read or wrote and reports an
//! external change when the current text hashes differently.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::domain::{AppError, Result};

/// External key-value text store holding the board document.
pub trait DocumentStore: Send + 'static {
    /// Connect to the host. May block; callers bound it with a timeout.
    ///
    /// # Errors
    /// Returns error when the host is unavailable.
    fn initialize(&mut self) -> Result<()>;

    /// Current document text (empty when nothing was stored yet).
    ///
    /// # Errors
    /// Returns error when the host cannot be read.
    fn read(&mut self) -> Result<String>;

    /// Replace the document text.
    ///
    /// # Errors
    /// Returns error when the host rejects the write.
    fn write(&mut self, text: &str) -> Result<()>;

    /// Whether someone else changed the text since our last read or write.
    ///
    /// # Errors
    /// Returns error when the host cannot be read.
    fn has_external_change(&mut self) -> Result<bool>;

    /// Short description for logs and the `paths` command.
    fn describe(&self) -> String;
}

/// Hash used to detect external edits.
#[must_use]
pub fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Note document stored as a file on disk.
#[derive(Debug)]
pub struct NoteFileStore {
    path: PathBuf,
    last_seen: Option<u64>,
}

impl NoteFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn directory_unavailable(&self) -> AppError {
        AppError::StoreUnavailable {
            message: format!("note directory does not exist: {}", self.directory().display()),
        }
    }

    /// A missing file is an empty note; a missing directory is a lost host.
    fn read_current(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.directory().is_dir() {
                    Ok(String::new())
                } else {
                    Err(self.directory_unavailable())
                }
            }
            Err(e) => Err(AppError::io(
                format!("Failed to read note: {}", self.path.display()),
                e,
            )),
        }
    }
}

impl DocumentStore for NoteFileStore {
    fn initialize(&mut self) -> Result<()> {
        if !self.directory().is_dir() {
            return Err(self.directory_unavailable());
        }

        if self.path.is_dir() {
            return Err(AppError::StoreUnavailable {
                message: format!("note path is a directory: {}", self.path.display()),
            });
        }

        tracing::debug!(path = %self.path.display(), "Note store initialized");
        Ok(())
    }

    fn read(&mut self) -> Result<String> {
        let text = self.read_current()?;
        self.last_seen = Some(content_hash(&text));
        Ok(text)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| {
            AppError::io(format!("Failed to write note: {}", tmp.display()), e)
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::io(format!("Failed to replace note: {}", self.path.display()), e)
        })?;

        self.last_seen = Some(content_hash(text));
        Ok(())
    }

    fn has_external_change(&mut self) -> Result<bool> {
        let current = content_hash(&self.read_current()?);
        Ok(self.last_seen != Some(current))
    }

    fn describe(&self) -> String {
        format!("note file {}", self.path.display())
    }
}
