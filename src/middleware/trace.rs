//! Per-request tracing.
//!
//! Opens an `info`-level `request` span carrying the method and path, runs
//! the rest of the chain inside it, and emits one event when the request
//! completes:
//!
//! ```text
//! INFO request{method=GET path=/users/42}: request completed status=200 latency=1.2ms
//! ```
//!
//! Responses with a 5xx status are reported at `warn` level instead.
//!
//! The layer needs no request-scoped data, so it is an ordinary
//! handler-wrapping middleware plugged in with [`adapt::middleware`].

use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use crate::adapt;
use crate::chain::Middleware;
use crate::handler::{BoxFuture, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// A middleware that traces every request passing through it.
pub fn trace() -> Middleware {
    adapt::middleware(|next| Box::new(Trace { inner: next }))
}

/// Wraps any handler with the per-request span.
pub struct Trace<H> {
    inner: H,
}

impl<H> Trace<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: Handler> Handler for Trace<H> {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let span = info_span!("request", method = %req.method(), path = req.path());
            let start = Instant::now();

            self.inner.serve(w, req).instrument(span.clone()).await;

            let status = w.status();
            let latency = start.elapsed();
            span.in_scope(|| {
                if status.is_server_error() {
                    warn!(status = status.as_u16(), ?latency, "request failed");
                } else {
                    info!(status = status.as_u16(), ?latency, "request completed");
                }
            });
        })
    }
}
