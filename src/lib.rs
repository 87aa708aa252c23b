//! # Mimicry
//!
//! Requests-style HTTP sessions over a TLS-fingerprinting transport.
//!
//! A [`Session`] turns a declarative [`Request`] into a wire request, sends it
//! through a [`Transport`] and normalizes the reply into a [`Response`] with a
//! decompressed body, the effective URL and a cookie snapshot. The bundled
//! [`HttpTransport`] speaks HTTP/1.1 and HTTP/2 over BoringSSL configured from
//! a browser [`TlsProfile`].
//!
//! ```no_run
//! # async fn demo() -> mimicry::Result<()> {
//! use mimicry::{Request, Session};
//!
//! let session = Session::new();
//! let request = Request::new().with_json(&serde_json::json!({"a": 1}))?;
//! let response = session.post("https://httpbin.org/post", Some(request)).await?;
//! response.raise_for_status()?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod cookie;
pub mod decompress;
pub mod error;
pub mod fingerprint;
pub mod headers;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

// Re-exports
pub use cookie::{Cookie, CookieJar, SharedCookieJar};
pub use decompress::decompress;
pub use error::{Error, Result, StatusClass};
pub use fingerprint::{TlsFingerprint, TlsProfile};
pub use headers::{browser_headers, canonical_header_key, Header};
pub use request::{BasicAuth, Body, FormValues, Request};
pub use response::Response;
pub use session::{Session, SessionBuilder};
pub use transport::{HttpTransport, Transport, TransportConfig, WireRequest, WireResponse};
