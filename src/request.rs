//! Per-call request descriptor.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::fingerprint::TlsProfile;
use crate::headers::Header;

/// URL-encoded form values.
///
/// Keys serialize in sorted order, values of one key in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: BTreeMap<String, Vec<String>>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), vec![value.into()]);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.first().map(String::as_str)
    }

    pub fn del(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `application/x-www-form-urlencoded` serialization.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.values {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormValues::new();
        for (k, v) in iter {
            form.add(k, v);
        }
        form
    }
}

/// Where the request body comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    /// Serialized with serde_json.
    Json(serde_json::Value),
    /// Serialized as `application/x-www-form-urlencoded`.
    Form(FormValues),
    /// Sent verbatim.
    Raw(String),
}

impl Body {
    /// Build a JSON body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Wire bytes for this body.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Json(value) => Ok(Bytes::from(serde_json::to_vec(value)?)),
            Self::Form(values) => Ok(Bytes::from(values.encode())),
            Self::Raw(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        }
    }

    /// Content type implied by the body kind.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Json(_) => Some("application/json"),
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
            Self::Empty | Self::Raw(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// `Authorization` header value.
    pub fn header_value(&self) -> String {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
        let plain = format!("{}:{}", self.username, self.password);
        format!("Basic {}", BASE64.encode(plain))
    }
}

/// Description of one outgoing call.
///
/// Empty/unset fields defer to the session's defaults.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub headers: Option<Header>,
    pub body: Body,
    pub cookies: HashMap<String, String>,
    pub auth: Option<BasicAuth>,
    pub proxy: Option<String>,
    /// `None` defers to the session.
    pub allow_redirects: Option<bool>,
    pub verify: bool,
    pub force_http1: bool,
    pub tls_profile: Option<TlsProfile>,
    pub timeout: Option<Duration>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: Method::GET,
            params: Vec::new(),
            headers: None,
            body: Body::Empty,
            cookies: HashMap::new(),
            auth: None,
            proxy: None,
            allow_redirects: None,
            verify: true,
            force_http1: false,
            tls_profile: None,
            timeout: None,
        }
    }
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headers(mut self, headers: Header) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Set one header, creating the header set if needed.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Header::new).set(name, value);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Body::json(value)?;
        Ok(self)
    }

    pub fn with_form(mut self, form: FormValues) -> Self {
        self.body = Body::Form(form);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Body::Raw(body.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = Some(allow);
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn force_http1(mut self, force: bool) -> Self {
        self.force_http1 = force;
        self
    }

    pub fn with_tls_profile(mut self, profile: TlsProfile) -> Self {
        self.tls_profile = Some(profile);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The URL with `params` appended to its query.
    pub fn resolved_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::InvalidUrl(format!("unsupported scheme {:?} in {}", other, url))),
        }
    }

    /// Non-empty per-call proxy.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref().filter(|p| !p.trim().is_empty())
    }
}
