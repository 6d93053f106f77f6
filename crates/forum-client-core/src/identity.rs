use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The acting role context of a user who may hold several roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    Investor,
    Startup,
}

impl NamespaceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NamespaceKind::Investor => "investor",
            NamespaceKind::Startup => "startup",
        }
    }
}

impl std::fmt::Display for NamespaceKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown namespace kind: {0}")]
pub struct ParseNamespaceError(String);

impl std::str::FromStr for NamespaceKind {
    type Err = ParseNamespaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "investor" => Ok(NamespaceKind::Investor),
            "startup" => Ok(NamespaceKind::Startup),
            other => Err(ParseNamespaceError(other.to_string())),
        }
    }
}

/// The principal a message or room participant is attributed to.
///
/// Serialized in the wire shape the backend expects for `author` and
/// `participants` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub namespace: NamespaceKind,
    pub namespace_id: i64,
}
