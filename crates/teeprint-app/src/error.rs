//! Errors surfaced by the session shell.

use teeprint_core::config::ConfigError;
use thiserror::Error;

/// Errors that abort a replay.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Script error: {0}")]
    Script(String),
    #[error("Step {step}: no element #{target} has been added")]
    UnknownTarget { step: usize, target: usize },
}

/// Result type for the shell.
pub type AppResult<T> = Result<T, AppError>;
