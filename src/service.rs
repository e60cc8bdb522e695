//! Bridge to hyper.
//!
//! stack does not open sockets, route or shut down servers: that belongs to
//! whatever runs the process. What it provides is the last step, turning a
//! hyper request into a [`Request`], running a handler against a fresh
//! [`ResponseWriter`] and turning the writer back into a hyper response.
//!
//! ```rust,no_run
//! use hyper_util::rt::{TokioExecutor, TokioIo};
//! use hyper_util::server::conn::auto::Builder;
//! use stack::{Chain, ChainService, middleware};
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> std::io::Result<()> {
//! let app = Chain::new([middleware::trace()])
//!     .then_handler_fn(|w, _req| Box::pin(async move { w.write("hello") }));
//! let svc = ChainService::new(app);
//!
//! let listener = TcpListener::bind("127.0.0.1:3000").await?;
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let svc = svc.clone();
//!     tokio::spawn(async move {
//!         let _ = Builder::new(TokioExecutor::new())
//!             .serve_connection(TokioIo::new(stream), svc)
//!             .await;
//!     });
//! }
//! # }
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;
use tracing::warn;

use crate::chain::HandlerChain;
use crate::error::Error;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::ResponseWriter;

/// Runs `handler` for one hyper request.
///
/// The request body is collected in full before the handler runs. Fails
/// only if the body cannot be read.
pub async fn dispatch<H, B>(handler: &H, req: http::Request<B>) -> Result<http::Response<Full<Bytes>>, Error>
where
    H: Handler + ?Sized,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let body = body.collect().await.map_err(Error::body)?.to_bytes();
    let req = Request::from_parts(parts, body);

    let mut w = ResponseWriter::new();
    handler.serve(&mut w, &req).await;
    Ok(w.into_response())
}

/// A hyper [`Service`] serving every request with one handler, normally a
/// [`HandlerChain`].
///
/// Errors are handled here, so hyper never sees one: a body that cannot be
/// read is answered with `400 Bad Request`.
pub struct ChainService<H = HandlerChain> {
    handler: Arc<H>,
}

impl<H: Handler> ChainService<H> {
    pub fn new(handler: H) -> Self {
        Self { handler: Arc::new(handler) }
    }
}

impl<H> Clone for ChainService<H> {
    fn clone(&self) -> Self {
        Self { handler: Arc::clone(&self.handler) }
    }
}

impl HandlerChain {
    /// Wraps the chain in a hyper [`Service`].
    pub fn into_service(self) -> ChainService {
        ChainService::new(self)
    }
}

impl<H, B> Service<http::Request<B>> for ChainService<H>
where
    H: Handler + 'static,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            match dispatch(&*handler, req).await {
                Ok(res) => Ok(res),
                Err(e) => {
                    warn!("rejecting request: {e}");
                    let mut w = ResponseWriter::new();
                    w.set_status(StatusCode::BAD_REQUEST);
                    Ok(w.into_response())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::task::{Context, Poll};

    use hyper::body::Frame;

    use super::*;
    use crate::Chain;

    /// A body whose connection dies before the first frame.
    struct Reset;

    impl Body for Reset {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
        }
    }

    fn echo() -> HandlerChain {
        Chain::default().then_handler_fn(|w, req| Box::pin(async move {
            w.write(format!("{} {} ", req.method(), req.path()));
            w.write(req.body());
        }))
    }

    #[tokio::test]
    async fn dispatch_collects_body() {
        let req = http::Request::post("/echo").body(Full::new(Bytes::from("payload"))).unwrap();
        let res = dispatch(&echo(), req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "POST /echo payload");
    }

    #[tokio::test]
    async fn dispatch_reports_unreadable_body() {
        let req = http::Request::post("/echo").body(Reset).unwrap();
        let err = dispatch(&echo(), req).await.unwrap_err();
        assert!(matches!(err, Error::Body(_)));
    }

    #[tokio::test]
    async fn service_answers_unreadable_body_with_400() {
        let req = http::Request::post("/echo").body(Reset).unwrap();
        let res = echo().into_service().call(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn service_clones_share_the_handler() {
        let svc = ChainService::new(echo());
        let other = svc.clone();
        assert!(Arc::ptr_eq(&svc.handler, &other.handler));

        let req = http::Request::get("/x").body(Full::new(Bytes::new())).unwrap();
        let res = other.call(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
