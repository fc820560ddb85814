//! Cookie jar that survives restarts.
//!
//! DESIGN
//! ======
//! The refresh credential is an HTTP-only cookie, so a process that only
//! persists the access token cannot refresh once that token expires.
//! [`PersistentJar`] wraps reqwest's in-memory [`Jar`] and mirrors every
//! `Set-Cookie` it accepts into a [`KeyValueStore`]. On load the saved
//! headers are replayed into the jar against the URL that set them, so
//! domain and path scoping work the same as in the original response.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are logged and swallowed, as in `TokenStore`: the jar
//! keeps working in memory for the rest of the process.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::state::token_store::{FileStore, KeyValueStore};

/// Key under which the saved `Set-Cookie` headers are persisted.
pub const COOKIES_KEY: &str = "cookies";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedCookie {
    url: String,
    set_cookie: String,
}

pub struct PersistentJar {
    jar: Jar,
    backend: Box<dyn KeyValueStore>,
    /// Keyed by `"<origin> <cookie name>"`.
    saved: Mutex<BTreeMap<String, SavedCookie>>,
}

impl PersistentJar {
    /// Load and replay the cookies persisted in `backend`.
    #[must_use]
    pub fn load(backend: impl KeyValueStore + 'static) -> Self {
        let saved: BTreeMap<String, SavedCookie> = match backend.get(COOKIES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "saved cookies unreadable; starting empty");
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "cookie store unreadable; starting empty");
                BTreeMap::new()
            }
        };

        let jar = Jar::default();
        for cookie in saved.values() {
            match Url::parse(&cookie.url) {
                Ok(url) => jar.add_cookie_str(&cookie.set_cookie, &url),
                Err(e) => tracing::warn!(error = %e, url = %cookie.url, "skipping saved cookie"),
            }
        }
        tracing::debug!(count = saved.len(), "cookies restored");
        Self { jar, backend: Box::new(backend), saved: Mutex::new(saved) }
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::load(FileStore::new(path))
    }

    fn persist(&self, saved: &BTreeMap<String, SavedCookie>) {
        let result = if saved.is_empty() {
            self.backend.remove(COOKIES_KEY)
        } else {
            match serde_json::to_string(saved) {
                Ok(raw) => self.backend.set(COOKIES_KEY, &raw),
                Err(e) => Err(e.into()),
            }
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist cookies");
        }
    }
}

impl CookieStore for PersistentJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&HeaderValue> = cookie_headers.collect();
        self.jar.set_cookies(&mut headers.iter().copied(), url);

        let origin = url.origin().ascii_serialization();
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        let mut changed = false;
        for raw in headers.iter().filter_map(|h| h.to_str().ok()) {
            let Some(name) = cookie_name(raw) else {
                continue;
            };
            let key = format!("{origin} {name}");
            if is_removal(raw) {
                changed |= saved.remove(&key).is_some();
            } else {
                saved.insert(key, SavedCookie { url: url.to_string(), set_cookie: raw.to_owned() });
                changed = true;
            }
        }
        if changed {
            self.persist(&saved);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

fn cookie_name(set_cookie: &str) -> Option<&str> {
    let (name, _) = set_cookie.split(';').next()?.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

/// An empty value or a non-positive `Max-Age` deletes the cookie.
fn is_removal(set_cookie: &str) -> bool {
    let mut parts = set_cookie.split(';');
    let value_empty = parts
        .next()
        .and_then(|pair| pair.split_once('='))
        .is_none_or(|(_, value)| value.trim().is_empty());
    value_empty
        || parts.any(|attr| {
            let Some((key, value)) = attr.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("max-age") && value.trim().parse::<i64>().is_ok_and(|secs| secs <= 0)
        })
}

#[cfg(test)]
#[path = "cookies_test.rs"]
mod tests;
