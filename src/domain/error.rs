//! Domain-level error types for the chronometer board.
//!
//! Validation errors leave the board untouched and are reported back to the
//! user. Integration errors (store, JSON, database) are recovered by the
//! sync service and only logged.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// No chronometer with the given id.
    #[error("Chronometer not found: {id}")]
    TimerNotFound { id: String },

    /// Start requested on a chronometer that is already running.
    #[error("Chronometer \"{name}\" is already running")]
    AlreadyRunning { name: String },

    /// Pause requested on a chronometer that is not running.
    #[error("Chronometer \"{name}\" is not running")]
    NotRunning { name: String },

    /// Time input did not match `HH:MM:SS`.
    #[error("Invalid format: \"{input}\". Please use HH:MM:SS")]
    InvalidTimeFormat { input: String },

    /// Minutes or seconds out of range.
    #[error("Invalid time: \"{input}\". Minutes and seconds must be less than 60")]
    InvalidTimeRange { input: String },

    /// Name was empty after trimming.
    #[error("Chronometer name cannot be empty")]
    EmptyName,

    /// Mutation attempted while read-only mode is enabled.
    #[error("Read-only mode is enabled; disable it in settings to edit chronometers")]
    ReadOnly,

    /// The host document store could not be reached.
    #[error("Document store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Failed to open or query the local database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization failed.
    #[error("JSON error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a not-found error for a chronometer id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::TimerNotFound { id: id.into() }
    }

    /// Whether this error is a rejected user input (state unchanged).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::TimerNotFound { .. }
                | Self::AlreadyRunning { .. }
                | Self::NotRunning { .. }
                | Self::InvalidTimeFormat { .. }
                | Self::InvalidTimeRange { .. }
                | Self::EmptyName
                | Self::ReadOnly
        )
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
