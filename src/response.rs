//! The response-writable target every handler writes to.
//!
//! A [`ResponseWriter`] starts out as an empty `200 OK`. Handlers set the
//! status, add headers and append to the body as the request travels through
//! the chain; once the outermost handler returns, the transport turns the
//! writer into a real HTTP response.

use std::fmt;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

use crate::error::Error;

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// A buffered HTTP response under construction.
///
/// ```rust
/// use stack::ResponseWriter;
/// use http::StatusCode;
///
/// let mut w = ResponseWriter::new();
/// w.set_status(StatusCode::CREATED);
/// w.header("content-type", "application/json").unwrap();
/// w.write(r#"{"id":42}"#);
///
/// assert_eq!(w.status(), StatusCode::CREATED);
/// assert_eq!(w.body(), br#"{"id":42}"#);
/// ```
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets header `name` to `value`, replacing any previous value.
    ///
    /// Fails if either string is not valid in an HTTP header.
    pub fn header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::invalid_header(name))?;
        let value = HeaderValue::from_str(value).map_err(|_| Error::invalid_header(name.as_str()))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Sets `content-type` to `text/plain; charset=utf-8`.
    pub fn text(&mut self) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    }

    /// Appends `data` to the body.
    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.body.extend_from_slice(data.as_ref());
    }

    /// Throws away everything written to the body so far. Status and headers
    /// are kept.
    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    /// Converts the writer into an `http` response, ready for hyper.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

/// Lets handlers use `write!` on the writer.
impl fmt::Write for ResponseWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s);
        Ok(())
    }
}
