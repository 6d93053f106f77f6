//! Session and identity core for the forum client.
//!
//! This crate owns the pieces every other client crate builds on:
//! - resolving the API base URL from the environment
//! - the credential store seam (the cookie jar itself lives with the HTTP
//!   client)
//! - decoding access-token claims without signature verification
//! - the session guard that turns a stored credential into an acting
//!   identity

pub mod claims;
pub mod config;
pub mod credential;
pub mod identity;
pub mod session;

pub use claims::{AccessClaims, DecodeError, decode_access_claims};
pub use config::{
    ConfigError, DEFAULT_BASE_URL, ENV_BASE_URL, normalize_base_url, resolve_base_url,
};
pub use credential::{ACCESS_TOKEN_COOKIE, CredentialStore, MemoryCredentialStore};
pub use identity::{Identity, NamespaceKind, ParseNamespaceError};
pub use session::{SessionGuard, is_expired, is_expired_at};
