//! # stack
//!
//! Composable middleware chains with a request-scoped context.
//!
//! ## The contract
//!
//! A [`Chain`] is an ordered list of middleware, declared once at startup.
//! Finalize it with a terminal handler and you get one [`Handler`] that, for
//! every request:
//!
//! 1. creates a fresh [`Context`], a key/value store for this request only,
//! 2. builds the handler graph around it, first-declared middleware outermost,
//! 3. runs it: middleware in the order declared, then the terminal handler.
//!
//! Any middleware may end the request early by not calling the next stage.
//! Chains are immutable: [`Chain::append`] returns a new chain, so a base
//! chain can be shared by every route that needs it.
//!
//! What stack deliberately leaves to the application:
//!
//! - **Listening and connections**: hyper, or whatever serves the process
//! - **Routing**: register each finalized chain with your router
//! - **Timeouts and cancellation**: the transport's job
//!
//! ## Quick start
//!
//! ```rust
//! use stack::{Chain, middleware};
//! use stack::middleware::from_fn;
//!
//! let set_token = from_fn(|ctx, w, req, next| Box::pin(async move {
//!     ctx.put("token", String::from("xyz"));
//!     next.run(w, req).await;
//! }));
//!
//! let base = Chain::new([middleware::trace(), middleware::request_id()]);
//!
//! let app = base.append([set_token]).then_fn(|ctx, w, _req| Box::pin(async move {
//!     let token: String = ctx.get("token").unwrap_or_default();
//!     w.write(token);
//! }));
//! ```
//!
//! Serve `app` with hyper through [`ChainService`], or call
//! [`Handler::serve`] on it directly, which is also how the tests drive it.

mod chain;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod service;

pub mod adapt;
pub mod middleware;

pub use chain::{Chain, HandlerChain, Middleware};
pub use context::Context;
pub use error::Error;
pub use handler::{BoxFuture, BoxHandler, Handler, HandlerFn, handler_fn};
pub use request::Request;
pub use response::ResponseWriter;
pub use service::{ChainService, dispatch};
