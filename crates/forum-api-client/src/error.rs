//! Gateway error taxonomy.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the request gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable credential and none could be obtained. Nothing was sent
    /// to the target endpoint; the caller decides where to send the user.
    #[error("not authenticated")]
    Unauthenticated,

    /// Transport-level failure talking to the backend.
    #[error("request failed: {message}")]
    Network { message: String },

    /// Non-2xx from the target endpoint, body passed through unmodified.
    #[error("http {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// The response body did not decode into the expected shape.
    #[error("response decode failed: {message}")]
    Decode { message: String },

    #[error("invalid request path")]
    InvalidPath,

    #[error(transparent)]
    BaseUrl(#[from] forum_client_core::ConfigError),
}

/// Gateway result type.
pub type Result<T> = std::result::Result<T, ApiError>;
