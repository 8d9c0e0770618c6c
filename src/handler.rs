//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one ranked list per
//! method, and middleware wraps handlers it knows nothing about. Both need a
//! single concrete type, so every handler is erased behind
//! `dyn ErasedHandler`:
//!
//! ```text
//! async fn get(req: Request) -> Result<Response, Error> { … }   ← user writes this
//!        ↓ router.on(Method::Get, "candidates/{id}", get)
//! get.into_boxed_handler()                                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get))                                      ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time                            ← one vtable dispatch
//! ```
//!
//! Middleware produces new `BoxedHandler`s around existing ones, so a
//! composed stack is still one `BoxedHandler` from the router's point of view.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// What every handler and middleware resolves to.
pub type HandlerResult = Result<Response, Error>;

/// A heap-allocated, type-erased future that resolves to a [`HandlerResult`].
pub type BoxFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Internal dispatch interface.
///
/// Public because middleware implementations receive and return
/// [`BoxedHandler`]s.
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Automatically satisfied for any `async fn` (or closure returning a future)
/// with the signature:
///
/// ```text
/// async fn name(req: Request) -> Result<impl IntoResponse, Error>
/// ```
///
/// and for [`Composed`](crate::middleware::Composed) stacks built by
/// [`compose`](crate::middleware::compose). The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl private::Sealed for crate::middleware::Composed {}

impl Handler for crate::middleware::Composed {
    fn into_boxed_handler(self) -> BoxedHandler {
        self.into_inner()
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler `F` and implements [`ErasedHandler`], bridging
/// the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}
