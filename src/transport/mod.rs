//! The transport capability the session drives, and its wire types.
//!
//! - [`Transport`]: send a wire request, hold proxy/redirect state and the cookie jar
//! - [`HttpTransport`]: HTTP/1.1 and HTTP/2 via hyper over BoringSSL

pub mod client;
pub mod connector;

use std::fmt;
use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use tokio::io::AsyncRead;
use url::Url;

use crate::cookie::Cookie;
use crate::error::{Error, Result};
use crate::fingerprint::TlsProfile;

pub use client::{HttpTransport, TransportConfig};

/// Response body stream. Dropping it releases the underlying resource.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// Network exchange capability.
///
/// Implementations own the cookie jar and the proxy/redirect settings; all
/// methods take `&self` so one transport can serve concurrent calls.
pub trait Transport: Sized + Send + Sync + 'static {
    /// Build a transport impersonating `profile`.
    fn from_profile(profile: TlsProfile) -> Result<Self>;

    /// Perform the exchange.
    fn send(&self, request: WireRequest) -> impl Future<Output = Result<WireResponse>> + Send;

    /// Route following requests through `proxy`, or directly when `None`.
    fn set_proxy(&self, proxy: Option<&str>) -> Result<()>;

    /// Store cookies scoped to `url`.
    fn set_cookies(&self, url: &Url, cookies: Vec<(String, String)>);

    /// Cookies the jar would send to `url`.
    fn cookies(&self, url: &Url) -> Vec<Cookie>;

    fn set_follow_redirect(&self, follow: bool);
}

/// Transport-level request.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Lowercase header names in wire order.
    pub header_order: Vec<String>,
    /// Requested h2 pseudo-header order. `HttpTransport` ignores it: hyper
    /// writes `:method`, `:scheme`, `:authority`, `:path` in a fixed order.
    pub pseudo_header_order: Vec<String>,
    pub timeout: Option<Duration>,
    pub verify: bool,
    pub force_http1: bool,
}

impl WireRequest {
    pub fn new(method: Method, url: Url, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body,
            header_order: Vec::new(),
            pseudo_header_order: Vec::new(),
            timeout: None,
            verify: true,
            force_http1: false,
        }
    }

    /// Set a header, replacing any existing value regardless of case.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// Transport-level response.
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BodyReader,
    /// URL that produced this response, after any followed redirects.
    pub url: Url,
    /// Redirect responses that led here, oldest first.
    pub history: Vec<WireResponse>,
}

impl WireResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: BodyReader, url: Url) -> Self {
        Self { status, headers, body, url, history: Vec::new() }
    }

    /// Response with an already buffered body.
    pub fn buffered(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>, url: Url) -> Self {
        let body: Bytes = body.into();
        Self::new(status, headers, Box::new(Cursor::new(body)), url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `Location` resolved against the URL that produced this response.
    pub fn location(&self) -> Option<Result<Url>> {
        let location = self.header("Location")?;
        Some(self.url.join(location).map_err(Error::from))
    }
}

impl fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("url", &self.url.as_str())
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}
