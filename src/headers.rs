//! Ordered, case-insensitive header model and browser header presets.
//!
//! Names are stored in MIME canonical form (`content-type` becomes
//! `Content-Type`), so every lookup and write is case-insensitive. Wire order
//! is tracked separately from the map: `order` lists lowercase names the way
//! they were declared, `pseudo_order` lists HTTP/2 pseudo-headers.

use crate::error::{Error, Result};
use crate::fingerprint::TlsProfile;

/// Ordered multi-map of header names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    entries: Vec<(String, Vec<String>)>,
    order: Vec<String>,
    pseudo_order: Vec<String>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw header block, one `Name: Value` per line.
    ///
    /// Blank lines and lines starting with `:`, `/` or `#` are skipped. Any
    /// other line without a colon is rejected. A repeated name keeps the value
    /// of its last line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut header = Header::new();
        for (idx, raw) in text.split('\n').enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(':') || line.starts_with('/') || line.starts_with('#') {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| Error::HeaderFormat {
                line: idx + 1,
                content: line.to_string(),
            })?;
            let name = name.trim();
            header.set(name, value.trim());
            header.order.push(name.to_lowercase());
        }
        Ok(header)
    }

    /// Replace all values of `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let key = canonical_header_key(name);
        match self.position(&key) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// Append `value` to the values of `name`.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        let key = canonical_header_key(name);
        match self.position(&key) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = canonical_header_key(name);
        self.position(&key)
            .and_then(|i| self.entries[i].1.first())
            .map(String::as_str)
    }

    /// All values of `name`, empty when absent.
    pub fn values(&self, name: &str) -> Vec<&str> {
        let key = canonical_header_key(name);
        self.position(&key)
            .map(|i| self.entries[i].1.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove every value of `name`.
    pub fn del(&mut self, name: &str) {
        let key = canonical_header_key(name);
        self.entries.retain(|(k, _)| *k != key);
    }

    /// One value per name (the first), in storage order.
    pub fn get_all(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|(k, vs)| vs.first().map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// `get_all` re-ordered so names listed in `order` come first.
    pub fn ordered_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.get_all();
        if self.order.is_empty() {
            return pairs;
        }
        let rank = |name: &str| {
            let lower = name.to_lowercase();
            self.order.iter().position(|o| *o == lower).unwrap_or(usize::MAX)
        };
        // stable: unranked names keep storage order
        pairs.sort_by_key(|(k, _)| rank(k));
        pairs
    }

    /// Lowercase header names in declared wire order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn set_order<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.order = names.into_iter().map(|n| n.as_ref().to_lowercase()).collect();
    }

    /// HTTP/2 pseudo-header order, e.g. `[":method", ":authority", ":scheme", ":path"]`.
    pub fn pseudo_order(&self) -> &[String] {
        &self.pseudo_order
    }

    pub fn set_pseudo_order<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pseudo_order = names.into_iter().map(|n| n.as_ref().to_lowercase()).collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, vs)| (k.as_str(), vs.as_slice()))
    }

    /// Browser headers for the default profile.
    pub fn default_browser() -> Self {
        browser_headers(TlsProfile::default())
    }

    fn position(&self, canonical: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == canonical)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = Header::new();
        for (k, v) in iter {
            header.add(k.as_ref(), v);
        }
        header
    }
}

impl From<Vec<(&str, &str)>> for Header {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        pairs.into_iter().collect()
    }
}

/// MIME canonical form of a header name.
///
/// The first letter and any letter following a hyphen are upper-cased, the
/// rest lower-cased. Names with bytes outside the token set are returned as-is.
pub fn canonical_header_key(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Browser-like headers matching the given TLS profile.
///
/// Used when neither the request nor the session supplies headers.
pub fn browser_headers(profile: TlsProfile) -> Header {
    let mut headers = Header::new();
    headers.set("User-Agent", profile.user_agent());
    headers.set(
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    );
    headers.set("Accept-Language", "en-US,en;q=0.9");
    headers.set("Accept-Encoding", "gzip, deflate, br");
    if let Some(major) = profile.chrome_major() {
        headers.set(
            "Sec-Ch-Ua",
            format!(r#""Chromium";v="{major}", "Google Chrome";v="{major}", "Not:A-Brand";v="99""#),
        );
        headers.set("Sec-Ch-Ua-Mobile", "?0");
        headers.set("Sec-Ch-Ua-Platform", r#""Windows""#);
        headers.set("Sec-Fetch-Dest", "document");
        headers.set("Sec-Fetch-Mode", "navigate");
        headers.set("Sec-Fetch-Site", "none");
        headers.set("Sec-Fetch-User", "?1");
    }
    headers.set("Upgrade-Insecure-Requests", "1");
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_header_key("content-type"), "Content-Type");
        assert_eq!(canonical_header_key("X-FORWARDED-FOR"), "X-Forwarded-For");
        assert_eq!(canonical_header_key("sec-ch-ua"), "Sec-Ch-Ua");
        // not a token, left alone
        assert_eq!(canonical_header_key("bad header"), "bad header");
    }

    #[test]
    fn test_canonical_key_idempotent() {
        for name in ["accept-encoding", "ACCEPT", "x-a-b-c", "Dnt", "weird name"] {
            let once = canonical_header_key(name);
            assert_eq!(canonical_header_key(&once), once);
        }
    }

    #[test]
    fn test_case_insensitive_set_get_del() {
        let mut h = Header::new();
        h.set("content-type", "text/plain");
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/plain"));
        h.set("Content-Type", "application/json");
        assert_eq!(h.len(), 1);
        assert_eq!(h.get("content-type"), Some("application/json"));
        h.del("CoNtEnT-tYpE");
        assert_eq!(h.get("Content-Type"), None);
        assert!(h.is_empty());
    }

    #[test]
    fn test_add_keeps_existing_values() {
        let mut h = Header::new();
        h.add("accept", "a");
        h.add("Accept", "b");
        assert_eq!(h.get("accept"), Some("a"));
        assert_eq!(h.values("ACCEPT"), vec!["a", "b"]);
        assert_eq!(h.get_all(), vec![("Accept".to_string(), "a".to_string())]);
    }

    #[test]
    fn test_parse_skips_comments_and_directives() {
        let text = "
            :authority: example.com
            // a note
            # comment
            Accept: */*
            user-agent: test/1.0
        ";
        let h = Header::parse(text).unwrap();
        assert_eq!(
            h.get_all(),
            vec![
                ("Accept".to_string(), "*/*".to_string()),
                ("User-Agent".to_string(), "test/1.0".to_string()),
            ]
        );
        assert_eq!(h.order(), &["accept".to_string(), "user-agent".to_string()]);
    }

    #[test]
    fn test_parse_last_set_wins() {
        let h = Header::parse("X-Token: one\nx-token: two").unwrap();
        assert_eq!(h.get("X-Token"), Some("two"));
        assert_eq!(h.values("X-Token").len(), 1);
    }

    #[test]
    fn test_parse_value_keeps_inner_colons() {
        let h = Header::parse("Referer: https://example.com:8443/a").unwrap();
        assert_eq!(h.get("referer"), Some("https://example.com:8443/a"));
    }

    #[test]
    fn test_parse_rejects_line_without_colon() {
        let err = Header::parse("Accept: */*\nnot a header").unwrap_err();
        match err {
            Error::HeaderFormat { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "not a header");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ordered_pairs_follow_order_list() {
        let mut h = Header::new();
        h.set("Accept", "*/*");
        h.set("User-Agent", "ua");
        h.set("X-Extra", "1");
        h.set_order(["User-Agent", "accept"]);
        let names: Vec<String> = h.ordered_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["User-Agent", "Accept", "X-Extra"]);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut a = Header::new();
        a.set("Accept", "*/*");
        let mut b = a.clone();
        b.set("Accept", "text/html");
        assert_eq!(a.get("accept"), Some("*/*"));

        let none: Option<Header> = None;
        assert!(none.clone().is_none());
    }

    #[test]
    fn test_browser_headers_match_profile() {
        let chrome = browser_headers(TlsProfile::Chrome110);
        assert!(chrome.get("user-agent").unwrap().contains("Chrome/110"));
        assert!(chrome.get("sec-ch-ua").unwrap().contains("v=\"110\""));

        let ios = browser_headers(TlsProfile::SafariIos16);
        assert!(ios.get("user-agent").unwrap().contains("iPhone"));
        assert!(ios.get("sec-ch-ua").is_none());
    }
}
