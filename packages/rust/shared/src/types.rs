//! Core domain types shared across the crawl pipeline.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SiteScribeError};

// ---------------------------------------------------------------------------
// Cookie
// ---------------------------------------------------------------------------

/// `SameSite` policy of a cookie, as exported by browser automation tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A single cookie-like credential record.
///
/// The JSON shape matches the cookie export format of common browser
/// automation tools (camelCase keys, `expires` in epoch seconds, `-1` for
/// session cookies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

fn default_cookie_path() -> String {
    "/".into()
}
fn default_expires() -> f64 {
    -1.0
}

impl Cookie {
    /// Session cookies (`expires <= 0`) never expire.
    pub fn is_expired(&self, now_epoch_secs: f64) -> bool {
        self.expires > 0.0 && self.expires < now_epoch_secs
    }

    /// Whether this cookie would be sent with a request to `url`.
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        let host = host.to_ascii_lowercase();
        let domain_ok = host == domain || host.ends_with(&format!(".{domain}"));
        if !domain_ok {
            return false;
        }

        if self.secure && url.scheme() != "https" {
            return false;
        }

        path_matches(url.path(), &self.path)
    }
}

/// RFC 6265 path matching: exact, or prefix ending at a `/` boundary.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if cookie_path.is_empty() || cookie_path == "/" {
        return true;
    }
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

// ---------------------------------------------------------------------------
// CredentialSet
// ---------------------------------------------------------------------------

/// Ordered, immutable set of cookies applied to every fetch session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialSet(Vec<Cookie>);

impl CredentialSet {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self(cookies)
    }

    /// Load a credential set from a JSON array of cookie records.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SiteScribeError::credential_load(path, e.to_string()))?;

        let set: Self = serde_json::from_str(&content)
            .map_err(|e| SiteScribeError::credential_load(path, e.to_string()))?;

        let now = Utc::now().timestamp() as f64;
        let expired = set.0.iter().filter(|c| c.is_expired(now)).count();
        tracing::debug!(
            ?path,
            cookies = set.len(),
            expired,
            "loaded credential set"
        );

        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cookie> {
        self.0.iter()
    }

    /// Build a `Cookie:` header value for a request to `url`.
    ///
    /// Returns `None` when no unexpired cookie matches.
    pub fn cookie_header_for(&self, url: &Url) -> Option<String> {
        let now = Utc::now().timestamp() as f64;
        let pairs: Vec<String> = self
            .0
            .iter()
            .filter(|c| !c.is_expired(now) && c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

impl<'a> IntoIterator for &'a CredentialSet {
    type Item = &'a Cookie;
    type IntoIter = std::slice::Iter<'a, Cookie>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
