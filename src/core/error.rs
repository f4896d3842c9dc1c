//! Error taxonomy for feed queries and credential lookups

/// Main error type for feed operations
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid version '{input}': {source}")]
    Parse {
        input: String,
        #[source]
        source: semver::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Operation was canceled")]
    Canceled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// True for failures that originate from talking to a remote feed
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            FeedError::Network(_) | FeedError::Protocol(_) | FeedError::Unauthorized(_)
        )
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Protocol(err.to_string())
        } else {
            FeedError::Network(err.to_string())
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
