//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, request::Parts};

/// An incoming HTTP request with its body already collected.
///
/// Handlers only ever see `&Request`: the request is read-only for the whole
/// chain. Anything a middleware wants to pass further down belongs in the
/// request's [`Context`](crate::Context).
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// A body-less `GET` request for `uri`. Mostly useful in tests.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid request target.
    pub fn get(uri: &str) -> Self {
        let uri: Uri = uri.parse().expect("invalid request uri");
        Self::new(Method::GET, uri)
    }

    pub(crate) fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self { method: parts.method, uri: parts.uri, headers: parts.headers, body }
    }

    /// Adds a header. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `value` is not a valid header name/value.
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        let value = value.parse().expect("invalid header value");
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Names are case-insensitive; values that are not
    /// visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::get("/").with_header("x-request-id", "abc");
        assert_eq!(req.header("X-Request-Id"), Some("abc"));
        assert_eq!(req.header("authorization"), None);
    }

    #[test]
    fn converts_from_http_request() {
        let req: Request = http::Request::post("/users?page=2")
            .header("content-type", "application/json")
            .body("{}")
            .unwrap()
            .into();

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/users");
        assert_eq!(req.query(), Some("page=2"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body(), b"{}");
    }
}
