//! Error translation: the boundary where an [`Error`](crate::Error) becomes
//! a failure envelope.

use std::sync::Arc;

use tracing::error;

use crate::error::classify;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;

/// Classifies and logs any failure from the rest of the stack and answers
/// with the normalized failure envelope.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorTranslation;

impl Middleware for ErrorTranslation {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(ErrorTranslationHandler { next })
    }
}

struct ErrorTranslationHandler {
    next: BoxedHandler,
}

impl ErasedHandler for ErrorTranslationHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let fut = self.next.call(req);
        Box::pin(async move {
            let err = match fut.await {
                Ok(res) => return Ok(res),
                Err(err) => err,
            };

            let normalized = classify(&err);
            error!(
                error = %err,
                detail = ?err,
                status = normalized.status().as_u16(),
                code = normalized.code(),
                "request failed",
            );

            let mut res = Response::failure(&normalized);
            res.set_header("Access-Control-Allow-Origin", "*");
            Ok(res)
        })
    }
}
