use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Another session is already active")]
    SessionBusy,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("No compatible 7-Zip executable found. Install 7-Zip (p7zip) and try again")]
    ToolUnavailable,

    #[error("External tool failed: {reason}")]
    ToolExecutionFailed { reason: String },

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;
