//! The handler contract and type erasure.
//!
//! # What a handler is
//!
//! Everything that takes part in a request, whether it is a middleware layer,
//! the terminal application handler or a whole finalized [`HandlerChain`],
//! satisfies one contract:
//!
//! ```text
//! serve(&self, w: &mut ResponseWriter, req: &Request)  →  future of ()
//! ```
//!
//! There is no return value. A handler produces its response by writing to
//! `w`, and a middleware layer decides whether the request continues by
//! calling (or not calling) the handler it wraps.
//!
//! # How per-request graphs are stored
//!
//! A chain rebuilds its handler graph on every request, and every layer of
//! that graph borrows the request's [`Context`]. The layers therefore have a
//! lifetime, `'c` (the lifetime of the context borrow), and are stored as
//! [`BoxHandler<'c>`] trait objects:
//!
//! ```text
//! terminal(&ctx)                      → BoxHandler<'c>    ← innermost
//! middleware(&ctx, BoxHandler<'c>)    → BoxHandler<'c>    ← one per layer
//! outermost.serve(&mut w, &req).await                     ← one vtable call per layer
//! ```
//!
//! Nothing in the graph can outlive the request that built it.
//!
//! [`HandlerChain`]: crate::HandlerChain
//! [`Context`]: crate::Context

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::ResponseWriter;

// ── Erased types ──────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future returned by [`Handler::serve`].
///
/// The future borrows the response writer and the request for `'a`, so it is
/// not `'static`. It is `Send` so a composed chain can run on tokio's
/// multi-threaded runtime.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A type-erased handler that may borrow request-scoped data for `'c`.
///
/// Middleware constructors receive and return this type, which is what lets
/// a chain hold layers of different concrete types.
pub type BoxHandler<'c> = Box<dyn Handler + 'c>;

// ── Handler trait ─────────────────────────────────────────────────────────────

/// The request-handling contract.
///
/// Implement this on your own types for middleware layers that need state,
/// or build one from an async closure with [`handler_fn`].
///
/// ```rust
/// use stack::{BoxFuture, Handler, Request, ResponseWriter};
///
/// struct Hello;
///
/// impl Handler for Hello {
///     fn serve<'a>(&'a self, w: &'a mut ResponseWriter, _req: &'a Request) -> BoxFuture<'a> {
///         Box::pin(async move { w.write("hello") })
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a>;
}

impl<H: Handler + ?Sized> Handler for &H {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (**self).serve(w, req)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (**self).serve(w, req)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (**self).serve(w, req)
    }
}

// ── Function handlers ─────────────────────────────────────────────────────────

/// A [`Handler`] backed by a plain `(response, request)` function.
///
/// Created with [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F>(F);

/// Turns an async `(response, request)` closure into a [`Handler`].
///
/// The closure returns a boxed future so that it may borrow both arguments:
///
/// ```rust
/// use stack::handler_fn;
///
/// let hello = handler_fn(|w, req| Box::pin(async move {
///     w.write(format!("hello from {}", req.path()));
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync,
{
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (self.0)(w, req)
    }
}
