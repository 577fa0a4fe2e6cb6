//! Access and refresh token storage

use super::config::TokenKeys;
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use storefront_core::KeyValueStore;
use tracing::debug;
use url::Url;

/// Where the client reads and writes its credentials
///
/// Implementations never fail: storage is treated as a local, always
/// available resource. Empty values are reported as absent.
pub trait TokenStore: Send + Sync {
    /// Current access token
    fn access(&self) -> Option<String>;

    /// Current refresh token
    fn refresh(&self) -> Option<String>;

    /// Replace the access token
    fn set_access(&self, token: &str);

    /// Persist both tokens after a successful login
    fn store_session(&self, access: &str, refresh: &str);

    /// Remove both tokens. Idempotent.
    fn clear(&self);
}

/// [`TokenStore`] over a key-value store, with an optional cookie fallback
pub struct StoredTokens {
    storage: Arc<dyn KeyValueStore>,
    keys: TokenKeys,
    cookies: Option<CookieFallback>,
}

struct CookieFallback {
    jar: Arc<Jar>,
    url: Url,
}

impl StoredTokens {
    pub fn new(storage: Arc<dyn KeyValueStore>, keys: TokenKeys) -> Self {
        Self {
            storage,
            keys,
            cookies: None,
        }
    }

    /// Also look for same-named cookies set for `url` when storage is empty
    pub fn with_cookie_fallback(mut self, jar: Arc<Jar>, url: Url) -> Self {
        self.cookies = Some(CookieFallback { jar, url });
        self
    }

    fn read(&self, key: &str) -> Option<String> {
        non_empty(self.storage.get(key)).or_else(|| {
            let fallback = self.cookies.as_ref()?;
            let token = non_empty(cookie_value(fallback, key));
            if token.is_some() {
                debug!("Using {} from cookie", key);
            }
            token
        })
    }
}

impl TokenStore for StoredTokens {
    fn access(&self) -> Option<String> {
        self.read(&self.keys.access)
    }

    fn refresh(&self) -> Option<String> {
        self.read(&self.keys.refresh)
    }

    fn set_access(&self, token: &str) {
        self.storage.set(&self.keys.access, token);
    }

    fn store_session(&self, access: &str, refresh: &str) {
        self.storage.set(&self.keys.access, access);
        self.storage.set(&self.keys.refresh, refresh);
    }

    fn clear(&self) {
        self.storage.remove(&self.keys.access);
        self.storage.remove(&self.keys.refresh);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn cookie_value(fallback: &CookieFallback, name: &str) -> Option<String> {
    let header = fallback.jar.cookies(&fallback.url)?;
    let header = header.to_str().ok()?;

    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
