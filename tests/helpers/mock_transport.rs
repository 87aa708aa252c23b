use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mimicry::{Cookie, Error, Result, SharedCookieJar, TlsProfile, Transport, WireRequest, WireResponse};
use url::Url;

type Responder = dyn Fn(&WireRequest) -> Result<WireResponse> + Send + Sync;

/// In-memory transport: records what it is asked to send and answers with a
/// responder closure. Cookies go through a real `SharedCookieJar`.
pub struct MockTransport {
    pub profile: TlsProfile,
    jar: SharedCookieJar,
    proxy: Mutex<Option<String>>,
    follow_redirects: AtomicBool,
    sent: Mutex<Vec<WireRequest>>,
    responder: Arc<Responder>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&WireRequest) -> Result<WireResponse> + Send + Sync + 'static,
    {
        Self {
            profile: TlsProfile::default(),
            jar: SharedCookieJar::new(),
            proxy: Mutex::new(None),
            follow_redirects: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            responder: Arc::new(responder),
        }
    }

    /// Transport that always answers `200 ok`.
    pub fn ok() -> Self {
        Self::new(|req| Ok(WireResponse::buffered(200, vec![], "ok", req.url.clone())))
    }

    /// Transport whose every send fails.
    pub fn failing() -> Self {
        Self::new(|_| Err(Error::connection("connection refused")))
    }

    pub fn sent(&self) -> Vec<WireRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_sent(&self) -> WireRequest {
        self.sent.lock().unwrap().last().cloned().expect("nothing sent")
    }

    pub fn proxy(&self) -> Option<String> {
        self.proxy.lock().unwrap().clone()
    }

    pub fn follows_redirects(&self) -> bool {
        self.follow_redirects.load(Ordering::SeqCst)
    }

    pub fn jar(&self) -> &SharedCookieJar {
        &self.jar
    }
}

impl Transport for MockTransport {
    fn from_profile(profile: TlsProfile) -> Result<Self> {
        let mut transport = Self::ok();
        transport.profile = profile;
        Ok(transport)
    }

    async fn send(&self, mut request: WireRequest) -> Result<WireResponse> {
        if !request.has_header("cookie") {
            if let Some(cookie) = self.jar.cookie_header(&request.url) {
                request.set_header("Cookie", cookie);
            }
        }
        self.sent.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;

        let response = (self.responder)(&request)?;
        self.jar.store_from_headers(&response.headers, &request.url);
        Ok(response)
    }

    fn set_proxy(&self, proxy: Option<&str>) -> Result<()> {
        *self.proxy.lock().unwrap() = proxy.map(str::to_string);
        Ok(())
    }

    fn set_cookies(&self, url: &Url, cookies: Vec<(String, String)>) {
        self.jar.set_cookies(url, cookies);
    }

    fn cookies(&self, url: &Url) -> Vec<Cookie> {
        self.jar.cookies(url)
    }

    fn set_follow_redirect(&self, follow: bool) {
        self.follow_redirects.store(follow, Ordering::SeqCst);
    }
}
