//! Request logging and response hardening.

use std::sync::Arc;

use tracing::info;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::request::Request;

/// Headers stamped on every successful response.
const RESPONSE_HEADERS: [(&str, &str); 8] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Content-Type", "application/json"),
    ("Strict-Transport-Security", "max-age=31536000; includeSubDomains; preload"),
    (
        "Content-Security-Policy",
        "default-src 'self'; script-src 'self'; style-src 'self'; img-src 'self'; frame-ancestors 'self'",
    ),
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("X-XSS-Protection", "1; mode=block"),
    ("Referrer-Policy", "no-referrer"),
];

/// Logs a summary of each inbound request, then adds CORS and security
/// headers to the response. A failed delegate is passed through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Base;

impl Middleware for Base {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(BaseHandler { next })
    }
}

struct BaseHandler {
    next: BoxedHandler,
}

impl ErasedHandler for BaseHandler {
    fn call(&self, req: Request) -> BoxFuture {
        info!(
            path = req.path(),
            method = req.method(),
            headers = ?req.headers(),
            query = req.query(),
            path_params = ?req.params(),
            body = %req.body_lossy(),
            "incoming request",
        );

        let fut = self.next.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            for (name, value) in RESPONSE_HEADERS {
                res.set_header(name, value);
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainError, Error};
    use crate::middleware::compose;
    use crate::response::Response;

    #[tokio::test]
    async fn success_gets_every_header_once() {
        let stack = compose(
            |_req: Request| async { Ok::<_, Error>(Response::text("hi")) },
            &[Arc::new(Base)],
        );
        let res = stack.call(Request::new("GET", "/")).await.unwrap();

        for (name, value) in RESPONSE_HEADERS {
            assert_eq!(res.header(name), Some(value), "{name}");
        }
        assert_eq!(res.headers().len(), RESPONSE_HEADERS.len());
    }

    #[tokio::test]
    async fn failure_is_propagated_untouched() {
        let stack = compose(
            |_req: Request| async { Err::<Response, _>(Error::from(DomainError::not_found("ERR_X", "gone"))) },
            &[Arc::new(Base)],
        );
        let err = stack.call(Request::new("GET", "/")).await.unwrap_err();

        match err {
            Error::Domain(e) => assert_eq!(e.code(), "ERR_X"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
