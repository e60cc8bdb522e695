//! Writing middleware, plus a few ready-made layers.
//!
//! Middleware is the right place for cross-cutting concerns: structured
//! tracing, request-id injection, authentication. The quickest way to write
//! one is [`from_fn`], which takes an async closure receiving the request's
//! [`Context`], the response writer, the request and the [`Next`] stage:
//!
//! ```rust
//! use stack::middleware::from_fn;
//!
//! let require_json = from_fn(|_ctx, w, req, next| Box::pin(async move {
//!     if req.header("content-type") != Some("application/json") {
//!         w.set_status(http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
//!         return; // short-circuit: nothing after this layer runs
//!     }
//!     next.run(w, req).await;
//! }));
//! ```
//!
//! Built-in middleware:
//! - [`trace()`]: per-request span with method and path, status and latency on completion
//! - [`request_id()`]: request id in the context and the `x-request-id` header
//! - [`BasicAuth`]: HTTP Basic authentication

use std::sync::Arc;

use crate::chain::Middleware;
use crate::context::Context;
use crate::handler::{BoxFuture, BoxHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

pub mod basic_auth;
pub mod request_id;
pub mod trace;

pub use basic_auth::BasicAuth;
pub use request_id::{RequestId, request_id};
pub use trace::trace;

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the chain, as seen from inside a [`from_fn`] middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    inner: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Runs the remaining stages. Not calling this short-circuits the chain.
    pub fn run<'b>(self, w: &'b mut ResponseWriter, req: &'b Request) -> BoxFuture<'b>
    where
        'a: 'b,
    {
        self.inner.serve(w, req)
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Builds a [`Middleware`] from an async
/// `(context, response, request, next)` closure.
pub fn from_fn<F>(f: F) -> Middleware
where
    F: for<'a> Fn(&'a Context, &'a mut ResponseWriter, &'a Request, Next<'a>) -> BoxFuture<'a>
        + Send
        + Sync
        + 'static,
{
    let f = Arc::new(f);
    Middleware::new(move |ctx, next| Box::new(FnLayer { f: Arc::clone(&f), ctx, next }))
}

/// The per-request handler built by a [`from_fn`] middleware.
struct FnLayer<'c, F> {
    f: Arc<F>,
    ctx: &'c Context,
    next: BoxHandler<'c>,
}

impl<F> Handler for FnLayer<'_, F>
where
    F: for<'a> Fn(&'a Context, &'a mut ResponseWriter, &'a Request, Next<'a>) -> BoxFuture<'a>
        + Send
        + Sync,
{
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (self.f)(self.ctx, w, req, Next { inner: &*self.next })
    }
}
