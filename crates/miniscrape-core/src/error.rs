use thiserror::Error;

/// Application-wide error types for miniscrape.
///
/// Per-page failures never escape a scrape run; they are folded into
/// [`crate::models::RunResult::error`] by the resolvers.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// HTTP request failed or returned a non-2xx status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// External content command could not be run or produced nothing.
    #[error("Command '{command}' failed: {message}")]
    CommandError { command: String, message: String },

    /// Malformed CSS selector or XPath expression, or a page without either.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// HTML-to-Markdown/text conversion failed.
    #[error("Cleaner error: {0}")]
    CleanerError(String),

    /// A filter could not be applied.
    #[error("Filter '{filter}' failed: {message}")]
    FilterError {
        filter: &'static str,
        message: String,
    },

    /// Cache read/write failure.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller cancelled the run before the page resolved.
    #[error("Resolution cancelled")]
    Cancelled,

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true for failures that happened while talking to the remote page.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::Timeout(_) | AppError::NetworkError(_)
        )
    }
}
