use std::sync::{Mutex, PoisonError};

/// Name of the cookie the backend stores the access token in.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Read side of the stored credential.
///
/// Absent is a valid outcome, not an error. The client never writes the
/// credential itself: the backend rotates it through `Set-Cookie` headers
/// on login and refresh responses, and the HTTP client's jar picks those
/// up.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
}

/// In-memory store for tests and embeddings without a cookie jar.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.lock() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.lock().clone()
    }
}
