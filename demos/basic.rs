//! Minimal stack demo: a shared base chain, two routes, basic auth.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/admin
//!   curl -i -u admin:s3cret http://localhost:3000/admin
//!
//! stack does not route or listen. This file does both, by hand, to show
//! where a finalized chain plugs in.

use std::net::SocketAddr;

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use stack::middleware::{self, BasicAuth, from_fn};
use stack::{Chain, Handler, HandlerChain, Request, ResponseWriter};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    // Shared by every route.
    let base = Chain::new([middleware::trace(), middleware::request_id()]);

    let home = base.then_fn(|ctx, w, _req| Box::pin(async move {
        let id = middleware::request_id::get(ctx).unwrap_or_default();
        w.write(format!("hello, request {id}\n"));
    }));

    let admin = base
        .append([
            BasicAuth::new("admin", "s3cret").realm("stack demo").into_middleware(),
            from_fn(|ctx, w, req, next| Box::pin(async move {
                ctx.put("greeting", "welcome back");
                next.run(w, req).await;
            })),
        ])
        .then_fn(|ctx, w, _req| Box::pin(async move {
            let user = middleware::basic_auth::user(ctx).unwrap_or_default();
            let greeting = ctx.get::<&str>("greeting").unwrap_or("hi");
            let env = ctx.get::<&str>("env").unwrap_or("unknown");
            w.write(format!("[{env}] {greeting}, {user}\n"));
        }))
        .inject("env", "demo");

    let app = Routes { home, admin };
    let svc = stack::ChainService::new(app);

    let addr: SocketAddr = ([127, 0, 0, 1], 3000).into();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "demo listening");

    // Every connection task, so shutdown can wait for in-flight requests.
    let mut tasks = tokio::task::JoinSet::new();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };
                let svc = svc.clone();
                tasks.spawn(async move {
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            // Reap finished connections so the set stays small.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    info!("demo stopped");

    Ok(())
}

/// Two-route dispatcher. A real service would use its router of choice.
struct Routes {
    home: HandlerChain,
    admin: HandlerChain,
}

impl Handler for Routes {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a Request) -> stack::BoxFuture<'a> {
        match req.path() {
            "/" => self.home.serve(w, req),
            "/admin" => self.admin.serve(w, req),
            _ => Box::pin(async move {
                w.set_status(http::StatusCode::NOT_FOUND);
                w.write("not found\n");
            }),
        }
    }
}
