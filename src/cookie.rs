//! Cookie storage shared between the calls of one session.
//!
//! `CookieJar` is the plain domain-scoped store. `SharedCookieJar` wraps it in
//! an `Arc<RwLock<_>>` and is the only form a transport hands out, so
//! concurrent calls never touch the map directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use url::Url;

use crate::error::{Error, Result};

/// A single cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub expires: Option<DateTime<Utc>>,
    /// Set when no `Domain` attribute was given: only `domain` itself matches,
    /// never its subdomains.
    pub host_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: normalize_domain(&domain.into()),
            path: "/".to_string(),
            secure: false,
            http_only: false,
            expires: None,
            host_only: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_host_only(mut self, host_only: bool) -> Self {
        self.host_only = host_only;
        self
    }

    /// Parse a `Set-Cookie` header value received from `request_url`.
    pub fn from_set_cookie_header(header: &str, request_url: &Url) -> Result<Self> {
        let request_domain = request_url
            .host_str()
            .ok_or_else(|| Error::CookieParse("No host in URL".to_string()))?;

        let mut parts = header.split(';').map(str::trim);
        let (name, value) = match parts.next().and_then(|p| p.split_once('=')) {
            Some((n, v)) => (n.trim().to_string(), v.trim().to_string()),
            None => return Err(Error::CookieParse("No = in cookie".to_string())),
        };
        if name.is_empty() {
            return Err(Error::CookieParse("Empty cookie name".to_string()));
        }

        let mut cookie = Cookie::new(name, value, request_domain).with_host_only(true);
        let mut max_age = None;
        for attr in parts {
            let attr_lower = attr.to_lowercase();
            if attr_lower == "secure" {
                cookie.secure = true;
            } else if attr_lower == "httponly" {
                cookie.http_only = true;
            } else if let Some((key, val)) = attr.split_once('=') {
                match key.trim().to_lowercase().as_str() {
                    "domain" if !val.trim().is_empty() => {
                        let domain = normalize_domain(val.trim());
                        if !domain_matches(request_url, &domain) {
                            return Err(Error::CookieParse(format!(
                                "Domain={} does not cover host {}",
                                domain, request_domain
                            )));
                        }
                        cookie.domain = domain;
                        cookie.host_only = false;
                    }
                    "path" if val.trim().starts_with('/') => cookie.path = val.trim().to_string(),
                    "expires" => cookie.expires = parse_cookie_date(val.trim()),
                    "max-age" => max_age = parse_max_age(val.trim()),
                    _ => {}
                }
            }
        }
        // Max-Age wins over Expires
        if let Some(secs) = max_age {
            cookie.expires = Some(max_age_expiry(secs));
        }
        Ok(cookie)
    }

    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|e| e <= Utc::now())
    }

    /// Domain, path, `Secure` and expiry check against a request URL.
    pub fn matches_url(&self, url: &Url) -> bool {
        let request_domain = match url.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };
        if self.secure && url.scheme() != "https" {
            return false;
        }
        if self.is_expired() {
            return false;
        }
        if self.host_only {
            if request_domain != self.domain {
                return false;
            }
        } else if request_domain != self.domain && !request_domain.ends_with(&format!(".{}", self.domain)) {
            return false;
        }
        let request_path = url.path();
        request_path == self.path
            || self.path == "/"
            || request_path.starts_with(&format!("{}/", self.path.trim_end_matches('/')))
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Domain-scoped cookie store.
#[derive(Debug, Default, Clone)]
pub struct CookieJar {
    cookies: HashMap<String, HashMap<String, Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; an already expired cookie deletes its namesake.
    pub fn store(&mut self, cookie: Cookie) {
        if cookie.is_expired() {
            self.remove(&cookie.domain, &cookie.name);
            return;
        }
        self.cookies
            .entry(cookie.domain.clone())
            .or_default()
            .insert(cookie.name.clone(), cookie);
    }

    pub fn cookies_for_url(&self, url: &Url) -> Vec<&Cookie> {
        self.cookies
            .values()
            .flat_map(|m| m.values())
            .filter(|c| c.matches_url(url))
            .collect()
    }

    pub fn build_cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(cookies.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("; "))
    }

    /// Store every `Set-Cookie` value received from `request_url`.
    pub fn store_from_headers(&mut self, headers: &[(String, String)], request_url: &Url) {
        for (name, value) in headers {
            if !name.eq_ignore_ascii_case("set-cookie") {
                continue;
            }
            match Cookie::from_set_cookie_header(value, request_url) {
                Ok(cookie) => self.store(cookie),
                Err(e) => tracing::warn!("ignoring Set-Cookie from {}: {}", request_url, e),
            }
        }
    }

    pub fn get(&self, domain: &str, name: &str) -> Option<&Cookie> {
        self.cookies.get(&normalize_domain(domain))?.get(name)
    }

    pub fn remove(&mut self, domain: &str, name: &str) -> Option<Cookie> {
        self.cookies.get_mut(&normalize_domain(domain))?.remove(name)
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Internally synchronized handle to a `CookieJar`.
///
/// Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct SharedCookieJar {
    inner: Arc<RwLock<CookieJar>>,
}

impl SharedCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store name/value pairs scoped to the host of `url`.
    pub fn set_cookies<I, K, V>(&self, url: &Url, cookies: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let Some(host) = url.host_str() else {
            tracing::warn!("cannot scope cookies to {}: no host", url);
            return;
        };
        let mut jar = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in cookies {
            let cookie = Cookie::new(name, value, host).with_host_only(true);
            tracing::trace!(domain = %cookie.domain, name = %cookie.name, "cookie set");
            jar.store(cookie);
        }
    }

    pub fn store(&self, cookie: Cookie) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).store(cookie);
    }

    pub fn store_from_headers(&self, headers: &[(String, String)], request_url: &Url) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .store_from_headers(headers, request_url);
    }

    /// Cookies that would be sent to `url`.
    pub fn cookies(&self, url: &Url) -> Vec<Cookie> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cookies_for_url(url)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).build_cookie_header(url)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.strip_prefix('.').unwrap_or(domain).to_lowercase()
}

/// Whether the host of `url` equals `domain` or is a subdomain of it. IP hosts
/// only match exactly.
fn domain_matches(url: &Url, domain: &str) -> bool {
    match url.host() {
        Some(url::Host::Domain(host)) => {
            let host = host.to_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        }
        Some(_) => url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(domain)),
        None => false,
    }
}

/// Digits that overflow `i64` saturate instead of being dropped.
fn parse_max_age(value: &str) -> Option<i64> {
    if let Ok(secs) = value.parse::<i64>() {
        return Some(secs);
    }
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

/// Zero or negative expires immediately; out-of-range values clamp to the
/// latest representable instant.
fn max_age_expiry(secs: i64) -> DateTime<Utc> {
    if secs <= 0 {
        return DateTime::<Utc>::MIN_UTC;
    }
    ChronoDuration::try_seconds(secs)
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn parse_cookie_date(date_str: &str) -> Option<DateTime<Utc>> {
    for fmt in ["%a, %d %b %Y %H:%M:%S GMT", "%a, %d-%b-%Y %H:%M:%S GMT", "%a, %d-%b-%y %H:%M:%S GMT"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date_str, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    date_str.parse::<i64>().ok().and_then(|ts| Utc.timestamp_opt(ts, 0).single())
}
