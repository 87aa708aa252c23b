//! Normalized call outcome and its decoders.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::headers::Header;
use crate::request::Request;

/// Outcome of one call.
///
/// `content` and `text` always hold the decompressed body, whatever the wire
/// `Content-Encoding` was.
#[derive(Debug, Clone)]
pub struct Response {
    url: Url,
    status_code: u16,
    headers: Header,
    cookies: HashMap<String, String>,
    content: Bytes,
    text: String,
    history: Vec<Response>,
    request: Arc<Request>,
}

impl Response {
    pub(crate) fn new(
        url: Url,
        status_code: u16,
        headers: Header,
        content: Bytes,
        request: Arc<Request>,
    ) -> Self {
        let text = String::from_utf8_lossy(&content).into_owned();
        Self {
            url,
            status_code,
            headers,
            cookies: HashMap::new(),
            content,
            text,
            history: Vec::new(),
            request,
        }
    }

    pub(crate) fn with_cookies(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookies = cookies;
        self
    }

    pub(crate) fn with_history(mut self, history: Vec<Response>) -> Self {
        self.history = history;
        self
    }

    /// Effective URL, after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &Header {
        &self.headers
    }

    /// Cookies the jar held for the request URL once the call finished.
    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// Decompressed body bytes.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Decompressed body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Intermediate redirect responses, oldest first.
    pub fn history(&self) -> &[Response] {
        &self.history
    }

    /// The descriptor that produced this response.
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// Decode the body as a JSON object.
    pub fn json_object(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        self.json()
    }

    /// Decode the body into a navigable JSON value.
    pub fn json_tree(&self) -> Result<serde_json::Value> {
        self.json()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.content).map_err(Error::from)
    }

    /// `Err(Error::HttpStatus)` for 4xx and 5xx codes.
    pub fn raise_for_status(&self) -> Result<()> {
        match Error::for_status(self.status_code) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
