//! Adapters from simpler shapes to the ones a [`Chain`] expects.
//!
//! | You have | Adapter | You get |
//! |---|---|---|
//! | `Fn(next) -> handler` | [`middleware`] | a [`Middleware`] that ignores the context |
//! | a [`Handler`] | [`handler`] | a terminal constructor that ignores the context |
//! | `Fn(response, request)` | [`handler_fn`] | a [`Handler`] |
//!
//! All of them are pure signature bridges: they hold nothing but the value
//! they wrap.
//!
//! ```rust
//! use stack::{Chain, adapt};
//!
//! let hello = adapt::handler_fn(|w, _req| Box::pin(async move { w.write("hello") }));
//! let app = Chain::default().then(adapt::handler(hello));
//! ```
//!
//! [`Chain`]: crate::Chain

use std::sync::Arc;

use crate::chain::Middleware;
use crate::context::Context;
use crate::handler::{BoxHandler, Handler};

pub use crate::handler::handler_fn;

/// Lifts a handler-wrapping function into a [`Middleware`].
///
/// `f` receives the next handler and returns the one that wraps it; the
/// request's context is never shown to it. Any layer that is generic over
/// its inner [`Handler`] can be plugged in this way:
///
/// ```rust
/// use stack::{BoxFuture, Handler, Request, ResponseWriter, adapt};
///
/// struct NoSniff<H>(H);
///
/// impl<H: Handler> Handler for NoSniff<H> {
///     fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
///         w.headers_mut().insert("x-content-type-options", "nosniff".parse().unwrap());
///         self.0.serve(w, req)
///     }
/// }
///
/// let no_sniff = adapt::middleware(|next| Box::new(NoSniff(next)));
/// ```
pub fn middleware<F>(f: F) -> Middleware
where
    F: for<'c> Fn(BoxHandler<'c>) -> BoxHandler<'c> + Send + Sync + 'static,
{
    Middleware::new(move |_ctx, next| f(next))
}

/// Turns a fixed handler into a terminal handler constructor.
///
/// The returned constructor ignores the context and hands out the same
/// handler for every request.
pub fn handler<H>(h: H) -> impl for<'c> Fn(&'c Context) -> BoxHandler<'c> + Send + Sync + 'static
where
    H: Handler + 'static,
{
    let h = Arc::new(h);
    terminal(move |_ctx| Box::new(Arc::clone(&h)))
}

/// Pins down the higher-ranked signature of a terminal constructor closure.
fn terminal<F>(f: F) -> F
where
    F: for<'c> Fn(&'c Context) -> BoxHandler<'c>,
{
    f
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::{BoxFuture, Chain, Request, ResponseWriter};

    struct Upper<H>(H);

    impl<H: Handler> Handler for Upper<H> {
        fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
            Box::pin(async move {
                self.0.serve(w, req).await;
                let upper = w.body().to_ascii_uppercase();
                w.clear_body();
                w.write(upper);
            })
        }
    }

    #[tokio::test]
    async fn middleware_adapter_wraps_next() {
        let app = Chain::new([middleware(|next| Box::new(Upper(next)))])
            .then_handler_fn(|w, _req| Box::pin(async move { w.write("quiet") }));

        let mut w = ResponseWriter::new();
        app.serve(&mut w, &Request::get("/")).await;
        assert_eq!(w.body(), b"QUIET");
    }

    #[tokio::test]
    async fn handler_adapter_is_transparent() {
        let teapot = handler_fn(|w, req| Box::pin(async move {
            w.set_status(StatusCode::IM_A_TEAPOT);
            w.write(format!("{} {}", req.method(), req.path()));
        }));
        let req = Request::get("/pot?brew=1");

        let mut direct = ResponseWriter::new();
        teapot.serve(&mut direct, &req).await;

        let app = Chain::default().then(handler(teapot));
        let mut chained = ResponseWriter::new();
        app.serve(&mut chained, &req).await;

        assert_eq!(direct.status(), chained.status());
        assert_eq!(direct.body(), chained.body());
        assert_eq!(chained.body(), b"GET /pot");
    }
}
