use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::identity::{Identity, NamespaceKind};

/// Claims carried by the access token.
///
/// The token is decoded without verifying its signature: integrity is the
/// backend's responsibility and the client only reads informational claims.
/// The namespace claims are absent until the user selects a cabinet, so
/// they are optional here and mandatory where an [`Identity`] is derived.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
    pub user_id: i64,
    #[serde(default)]
    pub name_space_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_namespace")]
    pub name_space_name: Option<NamespaceKind>,
    pub exp: i64,
}

impl AccessClaims {
    /// Acting identity, when all namespace claims are present and known.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        match (self.name_space_name, self.name_space_id) {
            (Some(namespace), Some(namespace_id)) => Some(Identity {
                user_id: self.user_id,
                namespace,
                namespace_id,
            }),
            _ => None,
        }
    }
}

// An unknown namespace kind must not invalidate the whole token; it only
// means no chat-authoring identity can be derived from it.
fn lenient_namespace<'de, D>(deserializer: D) -> Result<Option<NamespaceKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is not a three-segment JWT")]
    Structure,
    #[error("token payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
    #[error("token claims are not valid JSON: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Decode the payload segment of an access token into [`AccessClaims`].
///
/// No cryptographic check is performed. Callers treat any error here as an
/// expired credential.
pub fn decode_access_claims(token: &str) -> Result<AccessClaims, DecodeError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Structure);
    };
    let decoded = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&decoded)?)
}
