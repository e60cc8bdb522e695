//! Middleware chains.
//!
//! A [`Chain`] is an immutable, ordered list of [`Middleware`]. Build one at
//! startup, derive per-route variants from it with [`Chain::append`], and
//! finalize each variant with a terminal handler using one of the `then*`
//! methods. The result, a [`HandlerChain`], is an ordinary [`Handler`].
//!
//! ```text
//! Chain::new([a, b]).then_fn(t)
//!
//!   request ──▶ a ──▶ b ──▶ t
//!                          │
//!   response ◀─ a ◀─ b ◀───┘
//! ```
//!
//! The handler graph is rebuilt for every request, around a fresh
//! [`Context`]: the terminal constructor runs first, then each middleware
//! constructor from last to first, each wrapping the handler built so far.
//! The first-declared middleware ends up outermost and runs first.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::adapt;
use crate::context::{Context, Value};
use crate::handler::{BoxFuture, BoxHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

// ── Middleware ────────────────────────────────────────────────────────────────

type MiddlewareFn = dyn for<'c> Fn(&'c Context, BoxHandler<'c>) -> BoxHandler<'c> + Send + Sync;

/// A middleware constructor: given the request's [`Context`] and the next
/// handler, returns the handler that wraps it.
///
/// The constructor runs once per request. The handler it returns decides
/// whether the request continues: calling `next.serve(..)` passes it on,
/// returning without calling it ends the chain.
///
/// Most middleware is easier to write with
/// [`middleware::from_fn`](crate::middleware::from_fn) or, when it needs no
/// context, [`adapt::middleware`](crate::adapt::middleware). `new` takes the
/// raw constructor shape for layers implemented as their own [`Handler`]
/// type:
///
/// ```rust
/// use stack::{BoxFuture, BoxHandler, Context, Handler, Middleware, Request, ResponseWriter};
///
/// struct Greeting<'c> {
///     ctx: &'c Context,
///     next: BoxHandler<'c>,
/// }
///
/// impl Handler for Greeting<'_> {
///     fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
///         self.ctx.put("greeting", "hello");
///         self.next.serve(w, req)
///     }
/// }
///
/// let greeting = Middleware::new(|ctx, next| Box::new(Greeting { ctx, next }));
/// ```
#[derive(Clone)]
pub struct Middleware(Arc<MiddlewareFn>);

impl Middleware {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'c> Fn(&'c Context, BoxHandler<'c>) -> BoxHandler<'c> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn wrap<'c>(&self, ctx: &'c Context, next: BoxHandler<'c>) -> BoxHandler<'c> {
        (self.0)(ctx, next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An immutable, reusable sequence of middleware.
///
/// Cloning is cheap and every operation returns a new chain, so one base
/// chain can safely serve as the template for many routes:
///
/// ```rust
/// use stack::{Chain, middleware};
/// # let auth = middleware::request_id();
///
/// let base = Chain::new([middleware::trace(), middleware::request_id()]);
/// let admin = base.append([auth]);
///
/// assert_eq!(base.len(), 2);
/// assert_eq!(admin.len(), 3);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Chain {
    middlewares: Arc<[Middleware]>,
}

impl Chain {
    /// A chain running `middlewares` in the order given: the first one is
    /// the outermost layer and sees the request first.
    pub fn new(middlewares: impl IntoIterator<Item = Middleware>) -> Self {
        Self { middlewares: middlewares.into_iter().collect() }
    }

    /// A new chain with `more` running after this chain's middleware.
    ///
    /// `self` is left untouched.
    pub fn append(&self, more: impl IntoIterator<Item = Middleware>) -> Self {
        Self {
            middlewares: self.middlewares.iter().cloned().chain(more).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Finalizes the chain with a terminal handler constructor.
    ///
    /// `terminal` is called once per request with that request's context; the
    /// handler it returns is the innermost layer.
    pub fn then<F>(&self, terminal: F) -> HandlerChain
    where
        F: for<'c> Fn(&'c Context) -> BoxHandler<'c> + Send + Sync + 'static,
    {
        HandlerChain {
            middlewares: Arc::clone(&self.middlewares),
            terminal: Arc::new(terminal),
            seed: Arc::from([]),
        }
    }

    /// Finalizes the chain with an async `(context, response, request)`
    /// closure as the terminal handler.
    ///
    /// ```rust
    /// use stack::{Chain, middleware};
    ///
    /// let app = Chain::new([middleware::request_id()]).then_fn(|ctx, w, _req| Box::pin(async move {
    ///     let id = middleware::request_id::get(ctx).unwrap_or_default();
    ///     w.write(format!("request {id}"));
    /// }));
    /// ```
    pub fn then_fn<F>(&self, f: F) -> HandlerChain
    where
        F: for<'a> Fn(&'a Context, &'a mut ResponseWriter, &'a Request) -> BoxFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        let f = Arc::new(f);
        self.then(move |ctx| Box::new(ContextFn { f: Arc::clone(&f), ctx }))
    }

    /// Finalizes the chain with a handler that does not use the context.
    pub fn then_handler(&self, handler: impl Handler + 'static) -> HandlerChain {
        self.then(adapt::handler(handler))
    }

    /// Finalizes the chain with a plain `(response, request)` closure.
    pub fn then_handler_fn<F>(&self, f: F) -> HandlerChain
    where
        F: for<'a> Fn(&'a mut ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        self.then_handler(adapt::handler_fn(f))
    }
}

/// Terminal handler built by [`Chain::then_fn`].
struct ContextFn<'c, F> {
    f: Arc<F>,
    ctx: &'c Context,
}

impl<F> Handler for ContextFn<'_, F>
where
    F: for<'a> Fn(&'a Context, &'a mut ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync,
{
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (self.f)(self.ctx, w, req)
    }
}

// ── HandlerChain ──────────────────────────────────────────────────────────────

type TerminalFn = dyn for<'c> Fn(&'c Context) -> BoxHandler<'c> + Send + Sync;

/// A finalized chain: middleware plus a terminal handler, ready to serve.
///
/// Cheap to clone; clones share the same middleware and terminal handler.
/// Hand it to [`ChainService`](crate::ChainService) to serve it over hyper.
#[derive(Clone)]
pub struct HandlerChain {
    middlewares: Arc<[Middleware]>,
    terminal: Arc<TerminalFn>,
    seed: Arc<[(String, Value)]>,
}

impl HandlerChain {
    /// A new handler chain whose per-request context starts out with `key`
    /// set to `value`.
    ///
    /// Every request sees the same initial value; a stage that overwrites
    /// the key only changes its own request's context. `self` is left
    /// untouched.
    ///
    /// ```rust
    /// use stack::Chain;
    ///
    /// let app = Chain::default()
    ///     .then_fn(|ctx, w, _req| Box::pin(async move {
    ///         let name = ctx.get::<&str>("app").unwrap_or("unknown");
    ///         w.write(name);
    ///     }))
    ///     .inject("app", "billing");
    /// ```
    pub fn inject<T>(&self, key: impl Into<String>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync,
    {
        let key = key.into();
        let mut seed: Vec<(String, Value)> = self.seed.iter()
            .filter(|(k, _)| *k != key)
            .cloned()
            .collect();
        seed.push((key, Arc::new(value)));
        Self { seed: seed.into(), ..self.clone() }
    }

    /// Builds the handler graph for one request around `ctx`.
    fn build<'c>(&self, ctx: &'c Context) -> BoxHandler<'c> {
        let terminal = (self.terminal)(ctx);
        self.middlewares.iter().rev().fold(terminal, |next, mw| mw.wrap(ctx, next))
    }
}

impl Handler for HandlerChain {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let ctx = Context::with_values(self.seed.iter().cloned());
            trace!(layers = self.middlewares.len(), path = req.path(), "building handler chain");
            let handler = self.build(&ctx);
            handler.serve(w, req).await;
        })
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("layers", &self.middlewares.len())
            .field("injected", &self.seed.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::handler_fn;
    use crate::middleware::from_fn;

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn marker(trace: &Trace, name: &'static str) -> Middleware {
        let trace = Arc::clone(trace);
        from_fn(move |_ctx, w, req, next| {
            let trace = Arc::clone(&trace);
            Box::pin(async move {
                trace.lock().unwrap().push(name);
                w.write(name);
                next.run(w, req).await;
            })
        })
    }

    async fn body(h: &impl Handler) -> String {
        let mut w = ResponseWriter::new();
        h.serve(&mut w, &Request::get("/")).await;
        String::from_utf8(w.body().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn empty_chain_runs_terminal_only() {
        let app = Chain::default().then_handler_fn(|w, _req| Box::pin(async move { w.write("T") }));
        assert_eq!(body(&app).await, "T");
    }

    #[tokio::test]
    async fn middleware_run_in_declared_order() {
        let trace = Trace::default();
        let chain = Chain::new([marker(&trace, "1"), marker(&trace, "2"), marker(&trace, "3")]);
        let app = chain.then_handler_fn(|w, _req| Box::pin(async move { w.write("T") }));

        assert_eq!(body(&app).await, "123T");
        assert_eq!(*trace.lock().unwrap(), ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn append_leaves_receiver_untouched() {
        let trace = Trace::default();
        let base = Chain::new([marker(&trace, "a")]);
        let extended = base.append([marker(&trace, "b")]);

        let base_app = base.then_handler_fn(|w, _req| Box::pin(async move { w.write("T") }));
        let extended_app = extended.then_handler_fn(|w, _req| Box::pin(async move { w.write("T") }));

        assert_eq!(body(&base_app).await, "aT");
        assert_eq!(body(&extended_app).await, "abT");
        assert_eq!(base.len(), 1);
    }

    #[tokio::test]
    async fn inject_seeds_every_request() {
        let app = Chain::default()
            .then_fn(|ctx, w, _req| Box::pin(async move {
                let n = ctx.get::<u32>("n").unwrap_or(0);
                ctx.put("n", n + 1);
                w.write(n.to_string());
            }))
            .inject("n", 41u32);

        assert_eq!(body(&app).await, "41");
        assert_eq!(body(&app).await, "41");
    }

    #[tokio::test]
    async fn inject_replaces_earlier_value_for_same_key() {
        let base = Chain::default().then_fn(|ctx, w, _req| Box::pin(async move {
            w.write(ctx.get::<&str>("env").unwrap_or("none"));
        }));
        let staging = base.inject("env", "staging");
        let prod = staging.inject("env", "prod");

        assert_eq!(body(&base).await, "none");
        assert_eq!(body(&staging).await, "staging");
        assert_eq!(body(&prod).await, "prod");
    }

    #[tokio::test]
    async fn terminal_handler_is_rebuilt_per_request() {
        let built = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&built);
        let app = Chain::default().then(move |_ctx| {
            *counter.lock().unwrap() += 1;
            Box::new(handler_fn(|w, _req| Box::pin(async move { w.write("ok") })))
        });

        body(&app).await;
        body(&app).await;
        assert_eq!(*built.lock().unwrap(), 2);
    }
}
