//! Domain layer - core models, time handling and types.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, etc.).

pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use models::{BoardDocument, Chronometer, ChronometerColor, Session, Settings, StoredDocument};
#[cfg(test)]
pub use time::ManualClock;
pub use time::{format_hms, format_relative, parse_hms, Clock, SystemClock};
