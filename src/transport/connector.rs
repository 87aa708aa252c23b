//! BoringSSL TLS connector with optional HTTP `CONNECT` proxy tunnelling.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use boring::ssl::{SslConnector, SslMethod, SslSessionCacheMode, SslVerifyMode, SslVersion};
use boring::x509::X509;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;
use url::Url;

use crate::error::{Error, Result};
use crate::fingerprint::TlsFingerprint;

const MAX_CONNECT_RESPONSE: usize = 16 * 1024;

/// Parsed HTTP proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    /// Precomputed `Proxy-Authorization` value from the URL userinfo.
    pub authorization: Option<String>,
}

impl ProxyConfig {
    /// Parse `http://[user:pass@]host[:port]`.
    pub fn parse(proxy: &str) -> Result<Self> {
        let url = Url::parse(proxy.trim()).map_err(|e| Error::proxy(format!("invalid proxy URL {:?}: {}", proxy, e)))?;
        if url.scheme() != "http" {
            return Err(Error::proxy(format!("unsupported proxy scheme {:?}", url.scheme())));
        }
        let host = url
            .host_str()
            .ok_or_else(|| Error::proxy(format!("proxy URL {:?} has no host", proxy)))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        let authorization = if url.username().is_empty() {
            None
        } else {
            let user = percent_decode(url.username());
            let pass = percent_decode(url.password().unwrap_or(""));
            Some(format!("Basic {}", BASE64.encode(format!("{}:{}", user, pass))))
        };
        Ok(Self { host, port, authorization })
    }
}

fn percent_decode(s: &str) -> String {
    url::form_urlencoded::parse(format!("x={}", s.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// BoringSSL-based connector configured from a TLS fingerprint.
#[derive(Clone)]
pub struct BoringConnector {
    fingerprint: TlsFingerprint,
    root_certs: Vec<Vec<u8>>,
}

impl BoringConnector {
    pub fn with_fingerprint(fingerprint: TlsFingerprint) -> Self {
        Self { fingerprint, root_certs: Vec::new() }
    }

    /// Add custom root certificates (DER or PEM).
    pub fn with_root_certificates(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.root_certs = certs;
        self
    }

    fn configure_ssl(&self, verify: bool, http1_only: bool) -> Result<SslConnector> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())
            .map_err(|e| Error::tls(format!("Failed to create SSL connector: {}", e)))?;

        for cert_bytes in &self.root_certs {
            let cert = X509::from_der(cert_bytes)
                .or_else(|_| X509::from_pem(cert_bytes))
                .map_err(|e| Error::tls(format!("Invalid root certificate: {}", e)))?;
            builder
                .cert_store_mut()
                .add_cert(cert)
                .map_err(|e| Error::tls(format!("Failed to add root certificate: {}", e)))?;
        }

        let fp = &self.fingerprint;
        if !fp.cipher_list.is_empty() {
            builder
                .set_cipher_list(&fp.cipher_list.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set cipher list: {}", e)))?;
        }
        if !fp.curves.is_empty() {
            builder
                .set_curves_list(&fp.curves.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set curves: {}", e)))?;
        }
        if !fp.sigalgs.is_empty() {
            builder
                .set_sigalgs_list(&fp.sigalgs.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set signature algorithms: {}", e)))?;
        }
        builder.set_grease_enabled(fp.grease);
        builder.set_permute_extensions(fp.permute_extensions);

        builder
            .set_min_proto_version(Some(SslVersion::TLS1_2))
            .map_err(|e| Error::tls(format!("Failed to set min TLS version: {}", e)))?;
        builder
            .set_max_proto_version(Some(SslVersion::TLS1_3))
            .map_err(|e| Error::tls(format!("Failed to set max TLS version: {}", e)))?;

        builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);

        let alpn: &[u8] = if http1_only { b"\x08http/1.1" } else { b"\x02h2\x08http/1.1" };
        builder
            .set_alpn_protos(alpn)
            .map_err(|e| Error::tls(format!("Failed to set ALPN: {}", e)))?;

        if !verify {
            builder.set_verify(SslVerifyMode::NONE);
        }

        Ok(builder.build())
    }

    /// Connect to the origin of `url`, through `proxy` when given.
    pub async fn connect(
        &self,
        url: &Url,
        proxy: Option<&ProxyConfig>,
        verify: bool,
        http1_only: bool,
    ) -> Result<MaybeHttpsStream> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::connection(format!("Missing host in {}", url)))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let tcp_stream = match proxy {
            Some(proxy) => open_tunnel(proxy, host, port).await?,
            None => {
                let addr = format!("{}:{}", host, port);
                TcpStream::connect(&addr)
                    .await
                    .map_err(|e| Error::connection(format!("Failed to connect to {}: {}", addr, e)))?
            }
        };
        let _ = tcp_stream.set_nodelay(true);

        if url.scheme() != "https" {
            return Ok(MaybeHttpsStream::Http(tcp_stream));
        }

        let ssl_connector = self.configure_ssl(verify, http1_only)?;
        let mut ssl_config = ssl_connector
            .configure()
            .map_err(|e| Error::tls(format!("Failed to configure SSL: {}", e)))?;
        if !verify {
            ssl_config.set_verify_hostname(false);
        }

        // IPv6 literals come bracketed from the URL
        let server_name = host.trim_start_matches('[').trim_end_matches(']');
        let ssl_stream = tokio_boring::connect(ssl_config, server_name, tcp_stream)
            .await
            .map_err(|e| Error::tls(format!("TLS handshake with {} failed: {}", host, e)))?;

        Ok(MaybeHttpsStream::Https(ssl_stream))
    }
}

/// Open a `CONNECT` tunnel to `host:port` through the proxy.
async fn open_tunnel(proxy: &ProxyConfig, host: &str, port: u16) -> Result<TcpStream> {
    let proxy_addr = format!("{}:{}", proxy.host, proxy.port);
    let mut stream = TcpStream::connect(&proxy_addr)
        .await
        .map_err(|e| Error::proxy(format!("Failed to connect to proxy {}: {}", proxy_addr, e)))?;

    let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if let Some(auth) = &proxy.authorization {
        request.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];
    while !response.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::proxy("proxy closed the connection during CONNECT"));
        }
        response.extend_from_slice(&chunk[..n]);
        if response.len() > MAX_CONNECT_RESPONSE {
            return Err(Error::proxy("CONNECT response headers too large"));
        }
    }

    let status_line = String::from_utf8_lossy(response.split(|&b| b == b'\n').next().unwrap_or_default());
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| Error::proxy(format!("malformed CONNECT response: {:?}", status_line.trim())))?;
    if !(200..300).contains(&status) {
        return Err(Error::proxy(format!("proxy refused tunnel to {}:{}: {}", host, port, status_line.trim())));
    }
    tracing::debug!(proxy = %proxy_addr, tunnel = %format!("{}:{}", host, port), "CONNECT tunnel established");
    Ok(stream)
}

/// Stream that can be either HTTP (plain TCP) or HTTPS (TLS).
#[derive(Debug)]
pub enum MaybeHttpsStream {
    Http(TcpStream),
    Https(SslStream<TcpStream>),
}

impl MaybeHttpsStream {
    /// Check if HTTP/2 was negotiated via ALPN.
    pub fn is_h2(&self) -> bool {
        match self {
            MaybeHttpsStream::Http(_) => false,
            MaybeHttpsStream::Https(stream) => stream.ssl().selected_alpn_protocol() == Some(&b"h2"[..]),
        }
    }
}

impl AsyncRead for MaybeHttpsStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeHttpsStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_flush(cx),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
