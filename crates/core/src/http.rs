//! Request and response model shared by the router, the store and the network.
//!
//! Bodies are held as [`Bytes`], so cloning a response shares its buffer
//! instead of copying it. A response served to a page and written to the store
//! is cloned once at receipt and each copy goes to one consumer.

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::Error;

/// A request intercepted from a controlled page.
#[derive(Debug, Clone)]
pub struct Request {
    /// Upper-case HTTP method.
    pub method: String,
    /// Absolute URL on the application origin.
    pub url: Url,
    /// Whether the page is loading a full document (`Sec-Fetch-Mode: navigate`).
    pub navigate: bool,
    /// End-to-end request headers to forward.
    pub headers: Vec<(String, String)>,
    /// Request body; empty for GET.
    pub body: Bytes,
}

impl Request {
    /// A plain GET sub-resource request.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, navigate: false, headers: Vec::new(), body: Bytes::new() }
    }

    /// A GET for a full-page navigation.
    pub fn navigation(url: Url) -> Self {
        Self { navigate: true, ..Self::get(url) }
    }

    /// Same request aimed at another URL. Used for the offline fallback lookup.
    pub fn with_url(&self, url: Url) -> Self {
        Self { url, ..self.clone() }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Path component of the URL, always starting with `/`.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A complete HTTP response: status, headers and the fully read body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The network as seen by the router: one attempt per call, no retries.
///
/// `Err` means no response was produced at all (refused connection, DNS
/// failure, aborted body). HTTP error statuses are successful fetches.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<HttpResponse, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_constructors() {
        let url = Url::parse("http://localhost:5000/static/app.js").unwrap();
        let req = Request::get(url.clone());
        assert!(req.is_get());
        assert!(!req.navigate);
        assert_eq!(req.path(), "/static/app.js");

        let nav = Request::navigation(url);
        assert!(nav.navigate);
    }

    #[test]
    fn test_with_url_keeps_mode() {
        let nav = Request::navigation(Url::parse("http://localhost:5000/about").unwrap());
        let root = nav.with_url(Url::parse("http://localhost:5000/").unwrap());
        assert!(root.navigate);
        assert_eq!(root.path(), "/");
    }

    #[test]
    fn test_is_get_case_insensitive() {
        let mut req = Request::get(Url::parse("http://localhost/").unwrap());
        req.method = "get".into();
        assert!(req.is_get());
        req.method = "POST".into();
        assert!(!req.is_get());
    }

    #[test]
    fn test_response_header_lookup() {
        let res = HttpResponse::new(200, "ok").with_header("Content-Type", "audio/mpeg");
        assert_eq!(res.header("content-type"), Some("audio/mpeg"));
        assert_eq!(res.header("etag"), None);
        assert!(res.is_ok());
        assert!(!HttpResponse::new(404, "").is_ok());
    }

    #[test]
    fn test_clone_shares_body() {
        let res = HttpResponse::new(200, Bytes::from_static(b"B"));
        let copy = res.clone();
        assert_eq!(res.body.as_ptr(), copy.body.as_ptr());
    }
}
