//! CLI-specific error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Feed(#[from] feedcheck::FeedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Feed(feedcheck::FeedError::Configuration(_))
            | CliError::Feed(feedcheck::FeedError::InvalidArgument(_))
            | CliError::Feed(feedcheck::FeedError::Parse { .. }) => 2,
            CliError::Feed(e) if e.is_remote_failure() => 3,
            CliError::Feed(feedcheck::FeedError::Canceled) => 130,
            _ => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
