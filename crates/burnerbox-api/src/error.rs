//! Error types for API operations.

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the disposable-mail API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// Response body did not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
