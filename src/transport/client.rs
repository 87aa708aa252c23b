//! HTTP/1.1 and HTTP/2 transport via hyper over the BoringSSL connector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::Method;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use url::Url;

use super::connector::{BoringConnector, MaybeHttpsStream, ProxyConfig};
use super::{Transport, WireRequest, WireResponse};
use crate::cookie::{Cookie, SharedCookieJar};
use crate::error::{Error, Result};
use crate::fingerprint::TlsProfile;

/// Transport-wide settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline for a whole call (redirects included) when the request sets none.
    pub timeout: Duration,
    pub max_redirects: u32,
    /// Extra trusted roots, DER or PEM.
    pub root_certificates: Vec<Vec<u8>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_redirects: 10,
            root_certificates: Vec::new(),
        }
    }
}

impl TransportConfig {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn root_certificate(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.root_certificates.push(cert.into());
        self
    }
}

/// Fingerprinting HTTP transport.
///
/// Opens one connection per exchange; HTTP/2 is used when ALPN selects it.
pub struct HttpTransport {
    profile: TlsProfile,
    connector: BoringConnector,
    config: TransportConfig,
    jar: SharedCookieJar,
    proxy: RwLock<Option<ProxyConfig>>,
    follow_redirects: AtomicBool,
}

impl HttpTransport {
    pub fn new(profile: TlsProfile) -> Self {
        Self::with_config(profile, TransportConfig::default())
    }

    pub fn with_config(profile: TlsProfile, config: TransportConfig) -> Self {
        let connector = BoringConnector::with_fingerprint(profile.tls_fingerprint())
            .with_root_certificates(config.root_certificates.clone());
        Self {
            profile,
            connector,
            config,
            jar: SharedCookieJar::new(),
            proxy: RwLock::new(None),
            follow_redirects: AtomicBool::new(true),
        }
    }

    pub fn profile(&self) -> TlsProfile {
        self.profile
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn cookie_jar(&self) -> &SharedCookieJar {
        &self.jar
    }

    async fn send_following(&self, request: WireRequest) -> Result<WireResponse> {
        let follow = self.follow_redirects.load(Ordering::Acquire);
        let proxy = self.proxy.read().unwrap_or_else(PoisonError::into_inner).clone();

        let mut history = Vec::new();
        let mut current = request;
        loop {
            let mut response = self.send_once(&current, proxy.as_ref()).await?;
            self.jar.store_from_headers(&response.headers, &current.url);

            let next_url = match response.location() {
                Some(location) if follow && is_redirect_status(response.status) => location?,
                _ => {
                    response.history = history;
                    return Ok(response);
                }
            };
            if history.len() as u32 >= self.config.max_redirects {
                return Err(Error::RedirectLimit { count: history.len() as u32 });
            }
            tracing::debug!(status = response.status, from = %current.url, to = %next_url, "following redirect");
            current = redirect_request(&current, response.status, next_url);
            history.push(response);
        }
    }

    async fn send_once(&self, request: &WireRequest, proxy: Option<&ProxyConfig>) -> Result<WireResponse> {
        let stream = self
            .connector
            .connect(&request.url, proxy, request.verify, request.force_http1)
            .await?;
        let use_http2 = stream.is_h2() && !request.force_http1;

        let mut headers = request.headers.clone();
        if !has_header(&headers, "cookie") {
            if let Some(cookie_header) = self.jar.cookie_header(&request.url) {
                headers.push(("Cookie".to_string(), cookie_header));
            }
        }
        sort_by_order(&mut headers, &request.header_order);

        // h2 carries the authority in a pseudo-header; h1 needs Host and origin-form
        let uri = if use_http2 {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case("host"));
            request.url.as_str().to_string()
        } else {
            if !has_header(&headers, "host") {
                headers.insert(0, ("Host".to_string(), host_header(&request.url)));
            }
            origin_form(&request.url)
        };

        let mut builder = hyper::Request::builder().method(request.method.clone()).uri(uri);
        let header_map = builder
            .headers_mut()
            .ok_or_else(|| Error::http_protocol("Failed to build request headers"))?;
        for (name, value) in &headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidHeader(format!("{:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidHeader(format!("{:?}: {}", value, e)))?;
            header_map.append(name, value);
        }
        let hyper_request = builder
            .body(Full::new(request.body.clone()))
            .map_err(|e| Error::http_protocol(format!("Failed to build request: {}", e)))?;

        tracing::debug!(method = %request.method, url = %request.url, http2 = use_http2, "sending request");
        let response = if use_http2 {
            send_http2(stream, hyper_request).await?
        } else {
            send_http1(stream, hyper_request).await?
        };

        let (parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| Error::http_protocol(format!("Failed to read body: {}", e)))?
            .to_bytes();

        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();

        Ok(WireResponse::buffered(parts.status.as_u16(), headers, body_bytes, request.url.clone()))
    }
}

impl Transport for HttpTransport {
    fn from_profile(profile: TlsProfile) -> Result<Self> {
        Ok(Self::new(profile))
    }

    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let deadline = request.timeout.unwrap_or(self.config.timeout);
        match tokio::time::timeout(deadline, self.send_following(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(deadline)),
        }
    }

    fn set_proxy(&self, proxy: Option<&str>) -> Result<()> {
        let parsed = proxy.map(ProxyConfig::parse).transpose()?;
        *self.proxy.write().unwrap_or_else(PoisonError::into_inner) = parsed;
        Ok(())
    }

    fn set_cookies(&self, url: &Url, cookies: Vec<(String, String)>) {
        self.jar.set_cookies(url, cookies);
    }

    fn cookies(&self, url: &Url) -> Vec<Cookie> {
        self.jar.cookies(url)
    }

    fn set_follow_redirect(&self, follow: bool) {
        self.follow_redirects.store(follow, Ordering::Release);
    }
}

async fn send_http1(
    stream: MaybeHttpsStream,
    request: hyper::Request<Full<Bytes>>,
) -> Result<hyper::Response<Incoming>> {
    let io = TokioIo::new(stream);
    let (mut sender, conn) = http1::Builder::new()
        .title_case_headers(true)
        .handshake(io)
        .await
        .map_err(|e| Error::http_protocol(format!("HTTP/1.1 handshake failed: {}", e)))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::error!("HTTP/1.1 connection error: {}", e);
        }
    });

    sender
        .send_request(request)
        .await
        .map_err(|e| Error::http_protocol(format!("HTTP/1.1 request failed: {}", e)))
}

async fn send_http2(
    stream: MaybeHttpsStream,
    request: hyper::Request<Full<Bytes>>,
) -> Result<hyper::Response<Incoming>> {
    let io = TokioIo::new(stream);
    let (mut sender, conn) = http2::Builder::new(TokioExecutor::new())
        .handshake(io)
        .await
        .map_err(|e| Error::http_protocol(format!("HTTP/2 handshake failed: {}", e)))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::error!("HTTP/2 connection error: {}", e);
        }
    });

    sender
        .send_request(request)
        .await
        .map_err(|e| Error::http_protocol(format!("HTTP/2 request failed: {}", e)))
}

fn is_redirect_status(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Request for the next hop of a redirect chain.
///
/// 303 (and 301/302 after a POST) become a body-less GET; 307/308 replay the
/// request as is. Credentials are dropped when the origin changes.
fn redirect_request(previous: &WireRequest, status: u16, url: Url) -> WireRequest {
    let mut next = previous.clone();
    let same_origin = previous.url.origin() == url.origin();
    next.url = url;

    let becomes_get = (status == 303 && previous.method != Method::HEAD)
        || (matches!(status, 301 | 302) && previous.method == Method::POST);
    if becomes_get {
        next.method = Method::GET;
        next.body = Bytes::new();
        next.headers.retain(|(k, _)| {
            !k.eq_ignore_ascii_case("content-type") && !k.eq_ignore_ascii_case("content-length")
        });
    }
    // the jar re-adds whatever cookies belong to the new host in send_once
    if !same_origin {
        next.headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case("authorization") && !k.eq_ignore_ascii_case("cookie"));
    }
    next.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("host"));
    next
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

fn sort_by_order(headers: &mut [(String, String)], order: &[String]) {
    if order.is_empty() {
        return;
    }
    headers.sort_by_key(|(k, _)| {
        let lower = k.to_lowercase();
        order.iter().position(|o| *o == lower).unwrap_or(usize::MAX)
    });
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn origin_form(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
