//! HTTP server and graceful shutdown.
//!
//! Each HTTP request is one invocation of the router: the body is buffered,
//! the request deadline is stamped on its [`Context`](crate::Context), and
//! the router's answer is written back.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or Ctrl-C the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::{Context, Request};
use crate::response::Response;
use crate::router::Router;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    request_timeout: Duration,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use candidates::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000).into());
    /// ```
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr, request_timeout: DEFAULT_REQUEST_TIMEOUT }
    }

    /// Budget for one request's storage calls, measured from when its body
    /// has been read.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        let timeout = self.request_timeout;

        info!(addr = %self.addr, timeout_secs = timeout.as_secs(), "candidates listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once,
                // even if more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(&router, req, timeout).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("candidates stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Failures are answered
/// here, so hyper never sees an error.
async fn dispatch(
    router: &Router,
    req: hyper::Request<Incoming>,
    timeout: Duration,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(Response::status(http::StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let mut request = Request::new(parts.method.as_str(), parts.uri.path()).with_body(body);
    if let Some(query) = parts.uri.query() {
        request = request.with_query(query);
    }
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => request = request.with_header(name.as_str(), value),
            Err(_) => warn!(header = %name, "dropping non-visible-ASCII header value"),
        }
    }
    stamp_deadline(request.context_mut(), timeout);

    let response = match router.dispatch(request).await {
        Ok(response) => response,
        Err(e) => {
            // Only routes mounted without the error middleware get here.
            error!(error = ?e, "unhandled handler error");
            Response::status(http::StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    Ok(response.into_inner())
}

/// Sets the deadline `timeout` from now. A timeout too large to add to the
/// clock leaves the request without one.
fn stamp_deadline(ctx: &mut Context, timeout: Duration) {
    match Instant::now().checked_add(timeout) {
        Some(deadline) => ctx.set_deadline(deadline),
        None => warn!(timeout_secs = timeout.as_secs(), "request timeout out of range, no deadline set"),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// A signal handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_is_timeout_from_now() {
        let mut ctx = Context::default();
        stamp_deadline(&mut ctx, Duration::from_secs(5));
        assert_eq!(ctx.deadline(), Some(Instant::now() + Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn oversized_timeout_leaves_no_deadline() {
        let mut ctx = Context::default();
        stamp_deadline(&mut ctx, Duration::from_secs(u64::MAX));
        assert_eq!(ctx.deadline(), None);
    }
}
