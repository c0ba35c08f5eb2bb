//! Infrastructure layer - external adapters (note document, local database, config files).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod document_store;
pub mod local_storage;

pub use config::{config_file_path, ensure_config_exists, load_config, save_config};
pub use document_store::{DocumentStore, NoteFileStore};
pub use local_storage::{LocalStorage, BOARD_KEY};
