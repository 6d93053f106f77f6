//! The authenticated request gateway.

use std::sync::Arc;
use std::time::Duration;

use forum_client_core::{
    ConfigError, CredentialStore, SessionGuard, is_expired, normalize_base_url,
};
use reqwest::cookie::Jar;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cookie::CookieCredentialStore;
use crate::error::{ApiError, Result};
use crate::types::{LoginRequest, LoginResponse, RefreshResponse};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Authenticated request gateway for the forum REST API.
///
/// Every call evaluates its own fresh read of the credential, refreshes it
/// at most once when expired, and attaches the bearer header. The gateway
/// returns raw responses and never interprets bodies on the caller's
/// behalf; on an unrecoverable credential failure it returns
/// [`ApiError::Unauthenticated`] without touching the target endpoint, and
/// the caller decides where to send the user.
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
    session: SessionGuard,
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    /// Gateway with its own cookie jar as the credential store.
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;
        let origin =
            Url::parse(&base_url).map_err(|_| ApiError::BaseUrl(ConfigError::InvalidBaseUrl))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|error| ApiError::Network {
                message: error.to_string(),
            })?;
        let store = Arc::new(CookieCredentialStore::new(jar, origin));
        Ok(Self::assemble(base_url, config.timeout_ms, http, store))
    }

    /// Gateway over an externally owned credential store.
    ///
    /// Presence and expiry checks go through `store`; refresh responses
    /// still rotate cookies through the HTTP client when the backend sets
    /// them.
    pub fn with_store(config: ApiClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|error| ApiError::Network {
                message: error.to_string(),
            })?;
        Ok(Self::assemble(base_url, config.timeout_ms, http, store))
    }

    fn assemble(
        base_url: String,
        timeout_ms: u64,
        http: reqwest::Client,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms.max(250)),
            http,
            session: SessionGuard::new(store),
            refresh_gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    /// Issue an authenticated request and return the raw response.
    pub async fn request<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request_with_headers(method, path, HeaderMap::new(), body)
            .await
    }

    /// Like [`ApiClient::request`], with caller headers overriding the
    /// bearer/content-type defaults per key.
    pub async fn request_with_headers<B>(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;
        let token = self.usable_token().await?;

        let mut merged = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::Unauthenticated)?;
        merged.insert(AUTHORIZATION, bearer);
        merged.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &headers {
            merged.insert(name, value.clone());
        }

        let mut request = self
            .http
            .request(method, &url)
            .headers(merged)
            .timeout(self.timeout);
        if let Some(body) = body {
            // Serialized by hand so a caller-supplied content type survives.
            let payload = serde_json::to_vec(body).map_err(|error| ApiError::Decode {
                message: error.to_string(),
            })?;
            request = request.body(payload);
        }

        request.send().await.map_err(|error| ApiError::Network {
            message: error.to_string(),
        })
    }

    /// Authenticated GET, body decoded as JSON.
    pub async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request::<serde_json::Value>(Method::GET, path, None)
            .await?;
        decode_json_response(response).await
    }

    /// Authenticated POST, body decoded as JSON.
    pub async fn post_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let response = self.request(Method::POST, path, Some(payload)).await?;
        decode_json_response(response).await
    }

    /// Authenticate with email and password.
    ///
    /// The backend sets the `access_token`/`refresh_token` cookies on this
    /// response; the jar carries them into every later call.
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse> {
        let url = self.endpoint(Self::login_path()).ok_or(ApiError::InvalidPath)?;
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| ApiError::Network {
                message: error.to_string(),
            })?;
        decode_json_response(response).await
    }

    /// Exchange the refresh cookie for a new access token.
    ///
    /// One attempt, no backoff. Concurrent callers coalesce: whoever holds
    /// the gate refreshes, the rest re-check the rotated credential and
    /// skip the redundant round-trip.
    pub async fn refresh_access_token(&self) -> Result<String> {
        let _gate = self.refresh_gate.lock().await;
        if let Some(token) = self.session.credential()
            && !is_expired(&token)
        {
            debug!("credential already refreshed by a concurrent caller");
            return Ok(token);
        }

        let url = self
            .endpoint(Self::token_refresh_path())
            .ok_or(ApiError::InvalidPath)?;
        let response = match self.http.post(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "token refresh failed");
                return Err(ApiError::Unauthenticated);
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "token refresh rejected");
            return Err(ApiError::Unauthenticated);
        }
        match response.json::<RefreshResponse>().await {
            Ok(refreshed) => Ok(refreshed.access),
            Err(error) => {
                warn!(%error, "token refresh returned an unreadable body");
                Err(ApiError::Unauthenticated)
            }
        }
    }

    async fn usable_token(&self) -> Result<String> {
        let Some(token) = self.session.credential() else {
            debug!("no stored credential; not contacting the backend");
            return Err(ApiError::Unauthenticated);
        };
        if !is_expired(&token) {
            return Ok(token);
        }
        self.refresh_access_token().await
    }
}

/// Decode a response body, mapping non-2xx statuses to [`ApiError::Http`].
pub(crate) async fn decode_json_response<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = response.bytes().await.map_err(|error| ApiError::Network {
        message: error.to_string(),
    })?;
    if !status.is_success() {
        return Err(http_error(status, &bytes));
    }
    decode_body(&bytes)
}

/// Decode a JSON body that may arrive double-encoded (a JSON string whose
/// contents are the actual document), as the conversation endpoints
/// historically did.
pub(crate) fn decode_body<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_slice::<T>(bytes) {
        Ok(value) => Ok(value),
        Err(direct) => match serde_json::from_slice::<String>(bytes) {
            Ok(embedded) => serde_json::from_str::<T>(&embedded).map_err(|error| ApiError::Decode {
                message: error.to_string(),
            }),
            Err(_) => Err(ApiError::Decode {
                message: direct.to_string(),
            }),
        },
    }
}

pub(crate) fn http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let body = String::from_utf8_lossy(body).trim().to_string();
    let body = if body.is_empty() {
        "<empty>".to_string()
    } else {
        body
    };
    ApiError::Http { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn client_for(base_url: &str) -> ApiClient {
        ApiClient::new(ApiClientConfig::new(base_url)).expect("client builds")
    }

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = client_for("https://forum.example.com/");
        assert_eq!(
            client.endpoint("/startups/"),
            Some("https://forum.example.com/startups/".to_string())
        );
        assert_eq!(
            client.endpoint("startups/"),
            Some("https://forum.example.com/startups/".to_string())
        );
        assert_eq!(client.endpoint("  "), None);
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let result = ApiClient::new(ApiClientConfig::new("   "));
        assert!(matches!(
            result,
            Err(ApiError::BaseUrl(ConfigError::EmptyBaseUrl))
        ));
    }

    #[test]
    fn decode_body_accepts_plain_and_double_encoded_json() {
        let plain = br#"[{"id":"m1","content":"hi"}]"#;
        let direct: Vec<Message> = decode_body(plain).expect("plain body decodes");

        let wrapped = serde_json::to_vec(&String::from_utf8_lossy(plain).to_string())
            .expect("wrapping encodes");
        let embedded: Vec<Message> = decode_body(&wrapped).expect("wrapped body decodes");

        assert_eq!(direct, embedded);
        assert_eq!(direct[0].id, "m1");
    }

    #[test]
    fn decode_body_reports_the_direct_error_for_garbage() {
        let result = decode_body::<Vec<Message>>(b"not json at all");
        assert!(matches!(result, Err(ApiError::Decode { .. })));
    }

    #[test]
    fn http_error_preserves_status_and_trims_body() {
        let error = http_error(StatusCode::BAD_GATEWAY, b"  upstream died  ");
        assert_eq!(error.to_string(), "http 502 Bad Gateway: upstream died");

        let empty = http_error(StatusCode::SERVICE_UNAVAILABLE, b" ");
        assert_eq!(
            empty.to_string(),
            "http 503 Service Unavailable: <empty>"
        );
    }
}
