//! Chat error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("api error: {0}")]
    Api(#[from] forum_api_client::ApiError),

    #[error("no active namespace identity")]
    NoIdentity,

    #[error("only an investor can start a conversation")]
    NotInvestor,

    #[error("a send is already in flight")]
    SendInFlight,

    #[error("conversation is already open")]
    AlreadyOpen,

    #[error("conversation is closed")]
    Closed,
}

/// Chat result type.
pub type Result<T> = std::result::Result<T, ChatError>;
