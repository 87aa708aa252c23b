//! Requests-style session: turns descriptors into wire requests and wire
//! responses into [`Response`]s.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use http::Method;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;
use url::Url;

use crate::decompress::decompress;
use crate::error::Result;
use crate::fingerprint::TlsProfile;
use crate::headers::{browser_headers, Header};
use crate::request::{BasicAuth, Request};
use crate::response::Response;
use crate::transport::{HttpTransport, Transport, WireRequest, WireResponse};

/// Builder for [`Session`] defaults.
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    headers: Header,
    cookies: HashMap<String, String>,
    auth: Option<BasicAuth>,
    proxy: Option<String>,
    allow_redirects: bool,
    tls_profile: TlsProfile,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default headers, used when a call carries none.
    pub fn headers(mut self, headers: Header) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Cookie sent to every host until the server replaces it.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into()).filter(|p: &String| !p.trim().is_empty());
        self
    }

    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = allow;
        self
    }

    pub fn tls_profile(mut self, profile: TlsProfile) -> Self {
        self.tls_profile = profile;
        self
    }

    /// Session over an [`HttpTransport`] created on first use.
    pub fn build(self) -> Session {
        self.build_lazy()
    }

    /// Session over a `T` created on first use from the call's profile.
    pub fn build_lazy<T: Transport>(self) -> Session<T> {
        self.into_session(OnceCell::new())
    }

    /// Session over an existing transport.
    pub fn with_transport<T: Transport>(self, transport: T) -> Session<T> {
        self.into_session(OnceCell::from(transport))
    }

    fn into_session<T: Transport>(self, transport: OnceCell<T>) -> Session<T> {
        Session {
            headers: self.headers,
            default_cookies: self.cookies,
            auth: self.auth,
            proxy: self.proxy,
            allow_redirects: self.allow_redirects,
            tls_profile: self.tls_profile,
            transport,
            cookies: RwLock::new(HashMap::new()),
        }
    }
}

/// HTTP session with defaults shared by every call.
///
/// Per-call [`Request`] fields win over session defaults. The transport is
/// created lazily and reused; its cookie jar persists across calls. Calls may
/// run concurrently through `&self`, but proxy and redirect settings live on
/// the transport, so concurrent calls that disagree on them race.
pub struct Session<T: Transport = HttpTransport> {
    headers: Header,
    default_cookies: HashMap<String, String>,
    auth: Option<BasicAuth>,
    proxy: Option<String>,
    allow_redirects: bool,
    tls_profile: TlsProfile,
    transport: OnceCell<T>,
    cookies: RwLock<HashMap<String, String>>,
}

impl Session {
    pub fn new() -> Self {
        SessionBuilder::new().build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Session<T> {
    pub async fn get(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::GET, url, request).await
    }

    pub async fn post(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::POST, url, request).await
    }

    pub async fn put(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::PUT, url, request).await
    }

    pub async fn patch(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::PATCH, url, request).await
    }

    pub async fn delete(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::DELETE, url, request).await
    }

    pub async fn head(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::HEAD, url, request).await
    }

    pub async fn options(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::OPTIONS, url, request).await
    }

    pub async fn connect(&self, url: &str, request: Option<Request>) -> Result<Response> {
        self.request(Method::CONNECT, url, request).await
    }

    /// Send `request` (or an empty descriptor) to `url` with `method`.
    pub async fn request(&self, method: Method, url: &str, request: Option<Request>) -> Result<Response> {
        let mut request = request.unwrap_or_default();
        request.url = url.to_string();
        self.execute(method, request).await
    }

    /// Run one call end to end.
    ///
    /// Transport errors are returned unchanged and produce no response.
    pub async fn execute(&self, method: Method, mut request: Request) -> Result<Response> {
        request.method = method;
        let transport = self.transport_for(&request).await?;
        let wire = self.build_wire_request(transport, &request)?;

        tracing::debug!(method = %wire.method, url = %wire.url, "executing request");
        let response = transport.send(wire).await?;
        self.normalize(transport, Arc::new(request), response).await
    }

    /// Build the wire request for `request`, applying session defaults and
    /// pushing cookies, proxy and redirect policy onto the transport.
    pub async fn prepare_request(&self, request: &Request) -> Result<WireRequest> {
        let transport = self.transport_for(request).await?;
        self.build_wire_request(transport, request)
    }

    /// Read, decompress and normalize a wire response to `request`.
    pub async fn prepare_response(&self, request: Arc<Request>, response: WireResponse) -> Result<Response> {
        let transport = self.transport_for(&request).await?;
        self.normalize(transport, request, response).await
    }

    /// Cookies observed by the most recent call.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.cookies.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The transport, once a call has created it.
    pub fn transport(&self) -> Option<&T> {
        self.transport.get()
    }

    pub fn headers(&self) -> &Header {
        &self.headers
    }

    pub fn tls_profile(&self) -> TlsProfile {
        self.tls_profile
    }

    async fn transport_for(&self, request: &Request) -> Result<&T> {
        let profile = request.tls_profile.unwrap_or(self.tls_profile);
        self.transport
            .get_or_try_init(|| async move {
                tracing::debug!(%profile, "creating transport");
                T::from_profile(profile)
            })
            .await
    }

    fn build_wire_request(&self, transport: &T, request: &Request) -> Result<WireRequest> {
        let body = request.body.to_bytes()?;
        let url = request.resolved_url()?;
        let mut wire = WireRequest::new(request.method.clone(), url.clone(), body);

        if !self.default_cookies.is_empty() {
            let present: Vec<String> = transport.cookies(&url).into_iter().map(|c| c.name).collect();
            let missing: Vec<(String, String)> = self
                .default_cookies
                .iter()
                .filter(|(name, _)| !present.contains(name))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if !missing.is_empty() {
                transport.set_cookies(&url, missing);
            }
        }
        if !request.cookies.is_empty() {
            let cookies = request.cookies.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            transport.set_cookies(&url, cookies);
        }

        transport.set_proxy(request.proxy().or(self.proxy.as_deref()))?;
        transport.set_follow_redirect(request.allow_redirects.unwrap_or(self.allow_redirects));

        let headers = match &request.headers {
            Some(headers) => headers.clone(),
            None if !self.headers.is_empty() => self.headers.clone(),
            None => browser_headers(request.tls_profile.unwrap_or(self.tls_profile)),
        };
        for (name, value) in headers.ordered_pairs() {
            wire.set_header(name, value);
        }
        wire.header_order = headers.order().to_vec();
        wire.pseudo_header_order = headers.pseudo_order().to_vec();

        if let Some(content_type) = request.body.content_type() {
            if !wire.has_header("content-type") {
                wire.set_header("Content-Type", content_type);
            }
        }
        if let Some(auth) = request.auth.as_ref().or(self.auth.as_ref()) {
            if !wire.has_header("authorization") {
                wire.set_header("Authorization", auth.header_value());
            }
        }

        wire.timeout = request.timeout;
        wire.verify = request.verify;
        wire.force_http1 = request.force_http1;
        Ok(wire)
    }

    async fn normalize(&self, transport: &T, request: Arc<Request>, mut response: WireResponse) -> Result<Response> {
        let request_url = request.resolved_url()?;

        let location = match response.location() {
            Some(Ok(location)) => Some(location),
            Some(Err(err)) => {
                tracing::warn!("ignoring unparsable Location header: {}", err);
                None
            }
            None => None,
        };
        let effective_url = match location {
            Some(location) => location,
            None if response.url != request_url => response.url.clone(),
            None => request_url.clone(),
        };

        let wire_history = std::mem::take(&mut response.history);
        let mut history = Vec::with_capacity(wire_history.len());
        for hop in wire_history {
            let url = hop.url.clone();
            history.push(read_response(hop, url, &request).await?);
        }

        let cookies: HashMap<String, String> = transport
            .cookies(&request_url)
            .into_iter()
            .map(|c| (c.name, c.value))
            .collect();

        let response = read_response(response, effective_url, &request)
            .await?
            .with_cookies(cookies.clone())
            .with_history(history);

        tracing::trace!(count = cookies.len(), "session cookies updated");
        *self.cookies.write().unwrap_or_else(PoisonError::into_inner) = cookies;
        Ok(response)
    }
}

/// Drain and decompress one wire response. The body reader is dropped here.
async fn read_response(response: WireResponse, url: Url, request: &Arc<Request>) -> Result<Response> {
    let WireResponse { status, headers, mut body, .. } = response;
    let mut raw = Vec::new();
    body.read_to_end(&mut raw).await?;
    drop(body);

    let headers: Header = headers.into_iter().collect();
    let content = decompress(&raw, headers.get("Content-Encoding"))?;
    Ok(Response::new(url, status, headers, content, Arc::clone(request)))
}
