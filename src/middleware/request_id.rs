//! Request ids.
//!
//! Every request gets an id: the one the client (or the reverse proxy) sent
//! in the request-id header, or a fresh UUID v4 when there is none. The id is
//! stored in the request's context, where [`get`] reads it back, and echoed
//! in the same header on the response.

use http::header::{HeaderName, HeaderValue};
use uuid::Uuid;

use crate::chain::Middleware;
use crate::context::Context;
use crate::middleware::from_fn;

/// Context key the id is stored under.
pub const KEY: &str = "stack.request_id";

/// Incoming ids longer than this are replaced with a generated one.
const MAX_LEN: usize = 128;

/// Returns the current request's id.
pub fn get(ctx: &Context) -> Option<String> {
    ctx.get(KEY)
}

/// Overrides the current request's id.
pub fn set(ctx: &Context, id: impl Into<String>) {
    ctx.put(KEY, id.into());
}

/// The request-id middleware with the default `x-request-id` header.
pub fn request_id() -> Middleware {
    RequestId::new().into_middleware()
}

/// Configuration for the request-id middleware.
///
/// ```rust
/// use stack::middleware::RequestId;
///
/// let mw = RequestId::new().header("x-correlation-id").into_middleware();
/// ```
#[derive(Clone, Debug)]
pub struct RequestId {
    header: HeaderName,
}

impl RequestId {
    pub fn new() -> Self {
        Self { header: HeaderName::from_static("x-request-id") }
    }

    /// Reads and writes the id under `name` instead of `x-request-id`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid lowercase header name.
    pub fn header(mut self, name: &'static str) -> Self {
        self.header = HeaderName::from_static(name);
        self
    }

    pub fn into_middleware(self) -> Middleware {
        let header = self.header;
        from_fn(move |ctx, w, req, next| {
            let id = req
                .header(header.as_str())
                .filter(|id| !id.is_empty() && id.len() <= MAX_LEN)
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            // Incoming ids were already valid header values and UUIDs always are.
            if let Ok(value) = HeaderValue::from_str(&id) {
                w.headers_mut().insert(header.clone(), value);
            }
            set(ctx, id);

            next.run(w, req)
        })
    }
}

impl Default for RequestId {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Chain, Handler, Request, ResponseWriter};

    fn echo_id() -> crate::HandlerChain {
        Chain::new([request_id()]).then_fn(|ctx, w, _req| Box::pin(async move {
            w.write(get(ctx).unwrap_or_default());
        }))
    }

    #[tokio::test]
    async fn keeps_incoming_id() {
        let mut w = ResponseWriter::new();
        echo_id().serve(&mut w, &Request::get("/").with_header("x-request-id", "req-7")).await;

        assert_eq!(w.body(), b"req-7");
        assert_eq!(w.headers()["x-request-id"], "req-7");
    }

    #[tokio::test]
    async fn generates_id_when_missing() {
        let mut w = ResponseWriter::new();
        echo_id().serve(&mut w, &Request::get("/")).await;

        let id = String::from_utf8(w.body().to_vec()).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(w.headers()["x-request-id"], id.as_str());
    }

    #[tokio::test]
    async fn replaces_oversized_id() {
        let long = "x".repeat(MAX_LEN + 1);
        let mut w = ResponseWriter::new();
        echo_id().serve(&mut w, &Request::get("/").with_header("x-request-id", &long)).await;

        assert_ne!(w.body(), long.as_bytes());
    }

    #[tokio::test]
    async fn custom_header() {
        let app = Chain::new([RequestId::new().header("x-correlation-id").into_middleware()])
            .then_handler_fn(|w, _req| Box::pin(async move { w.write("ok") }));

        let mut w = ResponseWriter::new();
        app.serve(&mut w, &Request::get("/").with_header("x-correlation-id", "c-1")).await;

        assert_eq!(w.headers()["x-correlation-id"], "c-1");
        assert!(w.headers().get("x-request-id").is_none());
    }
}
