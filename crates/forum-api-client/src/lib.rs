//! Authenticated REST client for the forum backend.
//!
//! The gateway wraps every outbound call: it reads the credential fresh
//! from the cookie jar, refreshes it once when expired, attaches the
//! bearer header, and hands the raw response back. Typed endpoint methods
//! for the users, startups, communications, and notifications resources
//! sit on top of it.

pub mod api;
pub mod cookie;
pub mod error;
pub mod gateway;
pub mod types;

pub use cookie::CookieCredentialStore;
pub use error::{ApiError, Result};
pub use gateway::{ApiClient, ApiClientConfig, DEFAULT_TIMEOUT_MS};
pub use types::{
    CreateConversationRequest, InvestorCabinet, LoginRequest, LoginResponse, Message,
    Notification, RefreshResponse, Room, SelectNamespaceRequest, SendMessageRequest, Startup,
    StartupCabinet,
};
