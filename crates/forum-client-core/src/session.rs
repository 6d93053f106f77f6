use std::sync::Arc;

use chrono::Utc;

use crate::claims::{AccessClaims, decode_access_claims};
use crate::credential::CredentialStore;
use crate::identity::Identity;

/// Decides whether the stored credential is usable and derives the acting
/// identity from it.
///
/// Namespace-kind policy beyond "known kind" is deliberately not enforced
/// here: whether an operation is investor-only is the calling feature's
/// decision.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn CredentialStore>,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Current credential, if the store has one.
    #[must_use]
    pub fn credential(&self) -> Option<String> {
        self.store.get()
    }

    /// Decoded claims of the current credential, expiry not considered.
    #[must_use]
    pub fn current_claims(&self) -> Option<AccessClaims> {
        let token = self.credential()?;
        decode_access_claims(&token).ok()
    }

    /// Whether a credential is stored and has not expired.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some_and(|token| !is_expired(&token))
    }

    /// Acting identity: requires an unexpired credential with all namespace
    /// claims present and of a known kind.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        let token = self.credential()?;
        let claims = decode_access_claims(&token).ok()?;
        if claims.exp <= Utc::now().timestamp() {
            return None;
        }
        claims.identity()
    }
}

/// True when the token fails to decode or its `exp` claim is at or before
/// `now` (unix seconds). Unparsable tokens are never treated as valid.
#[must_use]
pub fn is_expired_at(token: &str, now: i64) -> bool {
    match decode_access_claims(token) {
        Ok(claims) => claims.exp <= now,
        Err(_) => true,
    }
}

/// [`is_expired_at`] against the current wall clock.
#[must_use]
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryCredentialStore;
    use crate::identity::NamespaceKind;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn token_for(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    fn full_claims(exp: i64) -> serde_json::Value {
        serde_json::json!({
            "user_id": 7,
            "name_space_id": 3,
            "name_space_name": "investor",
            "exp": exp,
        })
    }

    fn guard_with(token: Option<&str>) -> SessionGuard {
        let store = match token {
            Some(token) => MemoryCredentialStore::with_token(token),
            None => MemoryCredentialStore::new(),
        };
        SessionGuard::new(Arc::new(store))
    }

    #[test]
    fn unexpired_decodable_credential_authenticates() {
        let far_future = Utc::now().timestamp() + 3600;
        let guard = guard_with(Some(&token_for(&full_claims(far_future))));
        assert!(guard.is_authenticated());
        let identity = guard.current_identity().expect("identity");
        assert_eq!(identity.user_id, 7);
        assert_eq!(identity.namespace, NamespaceKind::Investor);
        assert_eq!(identity.namespace_id, 3);
    }

    #[test]
    fn missing_credential_is_not_authenticated() {
        let guard = guard_with(None);
        assert!(!guard.is_authenticated());
        assert_eq!(guard.current_identity(), None);
        assert_eq!(guard.current_claims(), None);
    }

    #[test]
    fn expired_credential_is_not_authenticated() {
        let past = Utc::now().timestamp() - 10;
        let guard = guard_with(Some(&token_for(&full_claims(past))));
        assert!(!guard.is_authenticated());
        assert_eq!(guard.current_identity(), None);
        // Claims remain readable even when expired.
        assert!(guard.current_claims().is_some());
    }

    #[test]
    fn undecodable_credential_fails_closed() {
        assert!(is_expired("not-a-jwt"));
        let guard = guard_with(Some("not-a-jwt"));
        assert!(!guard.is_authenticated());
        assert_eq!(guard.current_identity(), None);
    }

    #[test]
    fn expiry_is_second_resolution_inclusive() {
        let token = token_for(&full_claims(1_000));
        assert!(is_expired_at(&token, 1_000));
        assert!(is_expired_at(&token, 1_001));
        assert!(!is_expired_at(&token, 999));
    }

    #[test]
    fn identity_requires_namespace_claims() {
        let far_future = Utc::now().timestamp() + 3600;
        let token = token_for(&serde_json::json!({
            "user_id": 7,
            "exp": far_future,
        }));
        let guard = guard_with(Some(&token));
        assert!(guard.is_authenticated());
        assert_eq!(guard.current_identity(), None);
    }
}
