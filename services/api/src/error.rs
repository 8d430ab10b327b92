//! Custom error types for the API client

use thiserror::Error;

/// Custom error type for backend calls
#[derive(Error, Debug)]
pub enum ApiError {
    /// A bearer-authenticated call was made without a token
    #[error("No token provided")]
    MissingToken,

    /// A required argument was empty
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    /// The request could not be sent or its body could not be read
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Request failed with status {0}")]
    Status(u16),
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
