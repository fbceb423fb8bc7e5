//! Error type for the headless runner.

use std::path::PathBuf;

use thiserror::Error;

use broadside_core::error::GameError;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Errors raised while running, saving or verifying games.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// The engine refused setup or an input.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Failed to read or write a file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Failed to encode or decode JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A batch was asked to verify zero runs.
    #[error("Nothing to verify: {0}")]
    Empty(String),
}

impl HeadlessError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
