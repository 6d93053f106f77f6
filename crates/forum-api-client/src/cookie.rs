use std::sync::Arc;

use forum_client_core::{ACCESS_TOKEN_COOKIE, CredentialStore};
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};

/// Credential store backed by the HTTP client's cookie jar.
///
/// The jar is the single owner of the credential: login and refresh
/// responses rotate the cookie through `Set-Cookie`, and this store only
/// ever reads it back for the configured origin.
pub struct CookieCredentialStore {
    jar: Arc<Jar>,
    origin: Url,
}

impl CookieCredentialStore {
    #[must_use]
    pub fn new(jar: Arc<Jar>, origin: Url) -> Self {
        Self { jar, origin }
    }
}

impl CredentialStore for CookieCredentialStore {
    fn get(&self) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        let raw = header.to_str().ok()?;
        raw.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == ACCESS_TOKEN_COOKIE).then(|| value.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://forum.example.com").expect("static url parses")
    }

    #[test]
    fn absent_cookie_reads_as_none() {
        let store = CookieCredentialStore::new(Arc::new(Jar::default()), origin());
        assert_eq!(store.get(), None);
    }

    #[test]
    fn reads_access_token_among_other_cookies() {
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str("csrftoken=zzz; Path=/", &origin());
        jar.add_cookie_str("access_token=abc.def.ghi; Path=/", &origin());
        jar.add_cookie_str("refresh_token=rrr; Path=/", &origin());

        let store = CookieCredentialStore::new(jar, origin());
        assert_eq!(store.get(), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn cookies_for_other_origins_are_invisible() {
        let jar = Arc::new(Jar::default());
        let elsewhere = Url::parse("http://other.example.com").expect("static url parses");
        jar.add_cookie_str("access_token=abc; Path=/", &elsewhere);

        let store = CookieCredentialStore::new(jar, origin());
        assert_eq!(store.get(), None);
    }
}
