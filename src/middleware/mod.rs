//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: trace-id propagation, request logging, security
//! headers and error translation.
//!
//! A middleware turns one handler into another. It may run code before
//! delegating, after delegating, or answer without delegating at all.
//! [`compose`] applies a sequence so the **first** middleware is the
//! **outermost**: for `[A, B, C]` around `H` the observable order is
//!
//! ```text
//! A-before → B-before → C-before → H → C-after → B-after → A-after
//! ```
//!
//! The result is a [`Composed`] handler, built once at startup and shared by
//! every request.
//!
//! Built-in middleware, in the order [`standard`] stacks them:
//! - [`Trace`]: trace id from `x-trace-id` or a fresh UUID, request span
//! - [`Base`]: request summary log, CORS and security response headers
//! - [`ErrorTranslation`]: the only place an [`Error`](crate::Error) becomes a response body

mod base;
mod error;
mod trace;

pub use base::Base;
pub use error::ErrorTranslation;
pub use trace::{TRACE_ID_HEADER, Trace};

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerResult};
use crate::request::Request;

/// A transformation from a handler to a handler.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// The stack every candidate route runs behind: `[Trace, Base, ErrorTranslation]`.
pub fn standard() -> Vec<Arc<dyn Middleware>> {
    vec![Arc::new(Trace), Arc::new(Base), Arc::new(ErrorTranslation)]
}

// ── Composition ───────────────────────────────────────────────────────────────

/// A handler wrapped in its middleware stack. Cheap to clone.
#[derive(Clone)]
pub struct Composed(BoxedHandler);

impl Composed {
    /// Runs one request through the whole stack.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }

    pub(crate) fn into_inner(self) -> BoxedHandler {
        self.0
    }
}

/// Wraps `handler` in `middlewares`, first element outermost.
///
/// Folds from the last middleware to the first, so each step wraps the stack
/// built so far.
pub fn compose(handler: impl Handler, middlewares: &[Arc<dyn Middleware>]) -> Composed {
    let stack = middlewares
        .iter()
        .rev()
        .fold(handler.into_boxed_handler(), |next, middleware| middleware.wrap(next));
    Composed(stack)
}

// ── Closure middleware ────────────────────────────────────────────────────────

/// The rest of the stack, handed to a [`from_fn`] middleware.
pub struct Next(BoxedHandler);

impl Next {
    pub fn run(self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

/// Builds a middleware from an async closure taking the request and [`Next`].
///
/// ```rust
/// use candidates::middleware::{self, Next};
/// use candidates::{Request, Response};
/// use http::StatusCode;
///
/// let deny_empty = middleware::from_fn(|req: Request, next: Next| async move {
///     if req.body().is_empty() {
///         return Ok(Response::status(StatusCode::BAD_REQUEST));
///     }
///     next.run(req).await
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(FromFnHandler { f: Arc::clone(&self.0), next })
    }
}

struct FromFnHandler<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F, Fut> ErasedHandler for FromFnHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        Box::pin((self.f)(req, Next(Arc::clone(&self.next))))
    }
}
