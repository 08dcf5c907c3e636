//! Error types for feedmerge.

use thiserror::Error;

/// Common error type for feedmerge.
#[derive(Error, Debug)]
pub enum FeedmergeError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    ///
    /// Raised while loading, defaulting or validating the config file.
    /// Always fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or HTTP-level failure while fetching a feed or page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The fetched document is not a feed the parser understands.
    #[error("parse error: {0}")]
    Parse(String),

    /// Rendering the aggregate into the output format failed.
    #[error("render error: {0}")]
    Render(String),

    /// The publish server failed to bind or serve.
    #[error("server error: {0}")]
    Server(String),
}

/// Result type alias for feedmerge operations.
pub type Result<T> = std::result::Result<T, FeedmergeError>;
