use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const ENV_BASE_URL: &str = "FORUM_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

/// Resolve the API base URL, preferring the environment over the local
/// default. Returns the normalized URL together with the source it came
/// from.
pub fn resolve_base_url() -> Result<(String, &'static str), ConfigError> {
    if let Some(base_url) = env_non_empty(ENV_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_BASE_URL));
    }
    normalize_base_url(DEFAULT_BASE_URL).map(|normalized| (normalized, "default_local"))
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}
