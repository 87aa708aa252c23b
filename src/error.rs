//! Error types for the mimicry crate.

use std::fmt;
use std::io;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of the exchange a failing status code blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 4xx.
    Client,
    /// 5xx.
    Server,
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("Client Error"),
            Self::Server => f.write_str("Server Error"),
        }
    }
}

/// Errors that can occur while building, sending or decoding a call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP protocol error reported by the transport.
    #[error("HTTP protocol error: {0}")]
    HttpProtocol(String),

    /// Status check requested through `Response::raise_for_status`.
    #[error("{status} {class}")]
    HttpStatus { status: u16, class: StatusClass },

    /// Redirect limit exceeded.
    #[error("Redirect limit exceeded ({count} redirects)")]
    RedirectLimit { count: u32 },

    /// Malformed line in a raw header block.
    #[error("Malformed header line {line}: {content:?}")]
    HeaderFormat { line: usize, content: String },

    /// Header name or value the wire format cannot carry.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// URL the transport cannot request.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Cookie parsing error.
    #[error("Cookie parse error: {0}")]
    CookieParse(String),

    /// Corrupt or truncated compressed body.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Request did not complete within its deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Proxy refused or failed to open a tunnel.
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Create the status error for a 4xx/5xx code, `None` for anything else.
    pub fn for_status(status: u16) -> Option<Self> {
        let class = match status {
            400..=499 => StatusClass::Client,
            500..=599 => StatusClass::Server,
            _ => return None,
        };
        Some(Self::HttpStatus { status, class })
    }

    /// Create an HTTP protocol error.
    pub fn http_protocol(message: impl Into<String>) -> Self {
        Self::HttpProtocol(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a proxy error.
    pub fn proxy(message: impl Into<String>) -> Self {
        Self::Proxy(message.into())
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a decompression error.
    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression(message.into())
    }

    /// Whether the error came from the network exchange rather than local input.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpProtocol(_)
                | Self::RedirectLimit { .. }
                | Self::Timeout(_)
                | Self::Connection(_)
                | Self::Proxy(_)
                | Self::Tls(_)
                | Self::Io(_)
        )
    }

    /// Status class for errors produced by `raise_for_status`.
    pub fn status_class(&self) -> Option<StatusClass> {
        match self {
            Self::HttpStatus { class, .. } => Some(*class),
            _ => None,
        }
    }
}
