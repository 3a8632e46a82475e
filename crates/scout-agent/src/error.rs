//! Error types for scout-agent

use thiserror::Error;

/// Result type alias using scout-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a research turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the model layer
    #[error(transparent)]
    Ai(#[from] scout_ai::Error),

    /// The model asked for a tool the registry does not know
    #[error("Tool {0} not found.")]
    UnknownTool(String),

    /// Tool arguments did not match the tool's schema
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    /// The planner could not produce a plan
    #[error("Planning error: {0}")]
    Planning(String),

    /// Loading or saving a checkpoint failed
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Checkpoint(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Checkpoint(e.to_string())
    }
}
